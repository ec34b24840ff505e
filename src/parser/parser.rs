use crate::atom_table::*;
use crate::machine::heap::*;
use crate::parser::ast::*;
use crate::parser::char_reader::*;
use crate::parser::lexer::*;
use crate::types::*;

use fxhash::FxHashMap;

use std::collections::VecDeque;
use std::fmt;

/// A construct whose operands are still being read.
#[derive(Debug)]
enum TokenDesc {
    /// An operator expression of at most this priority.
    Expr(u16),
    /// A prefix operator and its priority, awaiting its operand.
    Prefix(Atom, u16),
    /// An infix operator, its priority and its left operand, awaiting the
    /// right operand.
    Infix(Atom, u16, TermRef),
    /// `name(` and the arguments read so far.
    Args(Atom, Vec<TermRef>),
    Brackets,
    /// `[` and the items read so far.
    List(Vec<TermRef>),
    /// `[items|`.
    ListTail(Vec<TermRef>),
    Curly,
}

// the heap, operator table and variable names of the term being read,
// with the constructs still open in it, innermost last.
struct TermBuilder<'a> {
    heap: &'a mut Heap,
    op_dir: &'a OpDir,
    var_dict: FxHashMap<String, TermRef>,
    stack: Vec<TokenDesc>,
}

impl<'a> TermBuilder<'a> {
    fn variable(&mut self, name: String) -> TermRef {
        if name == "_" {
            return self.heap.var();
        }

        if let Some(&t) = self.var_dict.get(&name) {
            return t;
        }

        let t = self.heap.named_var(&name);
        self.var_dict.insert(name, t);
        t
    }

    // opens `desc`, whose next operand is an expression of at most
    // `max_prec`.
    fn open(&mut self, desc: TokenDesc, max_prec: u16) {
        self.stack.push(desc);
        self.stack.push(TokenDesc::Expr(max_prec));
    }

    fn max_prec(&self) -> u16 {
        match self.stack.last() {
            Some(&TokenDesc::Expr(max_prec)) => max_prec,
            _ => 1200,
        }
    }
}

/// Reads terms one at a time from a character stream.
pub struct Parser<R> {
    lexer: Lexer<R>,
    lookahead: Option<Token>,
    placeholders: Option<VecDeque<Term>>,
    double_quotes: DoubleQuotes,
}

impl<R> fmt::Debug for Parser<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("lexer", &self.lexer)
            .field("lookahead", &self.lookahead)
            .field("double_quotes", &self.double_quotes)
            .finish()
    }
}

fn negate(literal: Literal) -> Literal {
    match literal {
        Literal::Fixnum(n) => match n.checked_neg() {
            Some(n) => Literal::Fixnum(n),
            None => Literal::from_integer(-dashu::Integer::from(n)),
        },
        Literal::Integer(n) => Literal::from_integer(-(*n).clone()),
        Literal::Float(n) => Literal::from(-n.into_inner()),
        literal => literal,
    }
}

impl<R: CharRead> Parser<R> {
    /// A parser reading `stream`.
    pub fn new(stream: R) -> Self {
        Parser {
            lexer: Lexer::new(stream),
            lookahead: None,
            placeholders: None,
            double_quotes: DoubleQuotes::default(),
        }
    }

    /// Substitutes each bare `?` atom read from now on with the next of
    /// `args`.
    pub fn with_placeholders(mut self, args: impl IntoIterator<Item = Term>) -> Self {
        self.placeholders = Some(args.into_iter().collect());
        self
    }

    /// Sets how double-quoted text is read.
    pub fn with_double_quotes(mut self, double_quotes: DoubleQuotes) -> Self {
        self.double_quotes = double_quotes;
        self
    }

    /// Mutable access to the character stream.
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.lexer.reader
    }

    /// The zero-based line the lexer has reached.
    pub fn line_num(&self) -> usize {
        self.lexer.line_num
    }

    /// True if only layout and comments remain in the stream.
    pub fn eof(&mut self) -> Result<bool, ParserError> {
        Ok(self.lookahead.is_none() && self.lexer.eof()?)
    }

    fn peek(&mut self) -> Result<&Token, ParserError> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next_token()?);
        }

        match &self.lookahead {
            Some(token) => Ok(token),
            None => Err(ParserError::unexpected_eof()),
        }
    }

    fn next(&mut self) -> Result<Token, ParserError> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn unexpected(&self, token: &Token) -> ParserError {
        ParserError::UnexpectedToken(token.to_string(), self.lexer.line_num, self.lexer.col_num)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        let token = self.next()?;

        if token == expected {
            Ok(())
        } else {
            Err(self.unexpected(&token))
        }
    }

    /// Reads the next clause-level term, up to and including its end token.
    pub fn read_term(&mut self, heap: &mut Heap, op_dir: &OpDir) -> Result<TermRef, ParserError> {
        let mut b = TermBuilder {
            heap,
            op_dir,
            var_dict: FxHashMap::default(),
            stack: vec![TokenDesc::Expr(1200)],
        };

        loop {
            if let Some((term, prec)) = self.shift_operand(&mut b)? {
                if let Some(term) = self.reduce(&mut b, term, prec)? {
                    self.expect(Token::End)?;
                    return Ok(term);
                }
            }
        }
    }

    // the infix or postfix operator named by the lookahead token, if it
    // takes an operand of priority `left_prec` on its left within
    // `max_prec`.
    fn continuation_op(
        &mut self,
        op_dir: &OpDir,
        max_prec: u16,
        left_prec: u16,
    ) -> Result<Option<(Atom, Fixity, OpDesc)>, ParserError> {
        let name = match self.peek()? {
            Token::Literal(Literal::Atom(name)) => *name,
            Token::Comma => atom!(","),
            Token::HeadTailSeparator => atom!("|"),
            _ => return Ok(None),
        };

        for fixity in [Fixity::In, Fixity::Post] {
            if let Some(desc) = lookup_op(op_dir, name, fixity) {
                let (left_max, _) = desc.arg_precs();

                if desc.get_prec() <= max_prec && left_prec <= left_max {
                    return Ok(Some((name, fixity, desc)));
                }
            }
        }

        Ok(None)
    }

    // feeds a complete operand to the innermost open construct, closing
    // constructs until one needs another operand. Returns the whole term
    // once nothing is left open.
    fn reduce(
        &mut self,
        b: &mut TermBuilder,
        mut term: TermRef,
        mut prec: u16,
    ) -> Result<Option<TermRef>, ParserError> {
        while let Some(desc) = b.stack.pop() {
            match desc {
                TokenDesc::Expr(max_prec) => {
                    match self.continuation_op(b.op_dir, max_prec, prec)? {
                        Some((name, Fixity::Post, desc)) => {
                            self.next()?;

                            term = b.heap.apply(name, &[term]);
                            prec = desc.get_prec();

                            b.stack.push(TokenDesc::Expr(max_prec));
                        }
                        Some((name, _, desc)) => {
                            self.next()?;

                            let (_, right_max) = desc.arg_precs();

                            b.stack.push(TokenDesc::Expr(max_prec));
                            b.open(TokenDesc::Infix(name, desc.get_prec(), term), right_max);

                            return Ok(None);
                        }
                        None => {}
                    }
                }
                TokenDesc::Prefix(name, op_prec) => {
                    term = b.heap.apply(name, &[term]);
                    prec = op_prec;
                }
                TokenDesc::Infix(name, op_prec, left) => {
                    term = b.heap.apply(name, &[left, term]);
                    prec = op_prec;
                }
                TokenDesc::Args(name, mut args) => {
                    args.push(term);

                    match self.next()? {
                        Token::Comma => {
                            b.open(TokenDesc::Args(name, args), 999);
                            return Ok(None);
                        }
                        Token::Close => {
                            term = b.heap.apply(name, &args);
                            prec = 0;
                        }
                        token => return Err(self.unexpected(&token)),
                    }
                }
                TokenDesc::Brackets => {
                    self.expect(Token::Close)?;
                    prec = 0;
                }
                TokenDesc::List(mut items) => {
                    items.push(term);

                    match self.next()? {
                        Token::Comma => {
                            b.open(TokenDesc::List(items), 999);
                            return Ok(None);
                        }
                        Token::HeadTailSeparator => {
                            b.open(TokenDesc::ListTail(items), 999);
                            return Ok(None);
                        }
                        Token::CloseList => {
                            term = b.heap.list(&items);
                            prec = 0;
                        }
                        token => return Err(self.unexpected(&token)),
                    }
                }
                TokenDesc::ListTail(items) => {
                    self.expect(Token::CloseList)?;

                    term = b.heap.partial_list(&items, term);
                    prec = 0;
                }
                TokenDesc::Curly => {
                    self.expect(Token::CloseCurly)?;

                    term = b.heap.apply(atom!("{}"), &[term]);
                    prec = 0;
                }
            }
        }

        Ok(Some(term))
    }

    // true if the lookahead token can begin an operand of a prefix operator.
    fn next_starts_term(&mut self, op_dir: &OpDir) -> Result<bool, ParserError> {
        Ok(match self.peek()? {
            Token::Literal(Literal::Atom(name)) => {
                let name = *name;

                lookup_op(op_dir, name, Fixity::Pre).is_some()
                    || (lookup_op(op_dir, name, Fixity::In).is_none()
                        && lookup_op(op_dir, name, Fixity::Post).is_none())
            }
            Token::Literal(_)
            | Token::Var(_)
            | Token::String(_)
            | Token::BackQuotedString(_)
            | Token::Open
            | Token::OpenCT
            | Token::OpenList
            | Token::OpenCurly => true,
            _ => false,
        })
    }

    // reads the next token as the start of an operand. Returns the operand
    // if the token is one by itself, or opens the construct it begins.
    fn shift_operand(
        &mut self,
        b: &mut TermBuilder,
    ) -> Result<Option<(TermRef, u16)>, ParserError> {
        match self.next()? {
            Token::Literal(Literal::Atom(name)) => self.shift_name(b, name),
            Token::Literal(literal) => Ok(Some((b.heap.literal(literal), 0))),
            Token::Var(name) => Ok(Some((b.variable(name), 0))),
            Token::String(s) => Ok(Some((self.double_quoted(b, &s), 0))),
            Token::BackQuotedString(s) => {
                let codes: Vec<_> = s.chars().map(|c| b.heap.fixnum(c as i64)).collect();
                Ok(Some((b.heap.list(&codes), 0)))
            }
            Token::Open | Token::OpenCT => {
                b.open(TokenDesc::Brackets, 1200);
                Ok(None)
            }
            Token::OpenList => {
                if let Token::CloseList = self.peek()? {
                    self.next()?;
                    return self.shift_name(b, atom!("[]"));
                }

                b.open(TokenDesc::List(vec![]), 999);
                Ok(None)
            }
            Token::OpenCurly => {
                if let Token::CloseCurly = self.peek()? {
                    self.next()?;
                    return self.shift_name(b, atom!("{}"));
                }

                b.open(TokenDesc::Curly, 1200);
                Ok(None)
            }
            token => Err(self.unexpected(&token)),
        }
    }

    fn double_quoted(&mut self, b: &mut TermBuilder, s: &str) -> TermRef {
        match self.double_quotes {
            DoubleQuotes::Atom => b.heap.atom(Atom::build_with(s)),
            DoubleQuotes::Chars => {
                let chars: Vec<_> = s
                    .chars()
                    .map(|c| b.heap.atom(Atom::build_with(c.encode_utf8(&mut [0; 4]))))
                    .collect();

                b.heap.list(&chars)
            }
            DoubleQuotes::Codes => {
                let codes: Vec<_> = s.chars().map(|c| b.heap.fixnum(c as i64)).collect();
                b.heap.list(&codes)
            }
        }
    }

    fn shift_name(
        &mut self,
        b: &mut TermBuilder,
        name: Atom,
    ) -> Result<Option<(TermRef, u16)>, ParserError> {
        if let Token::OpenCT = self.peek()? {
            self.next()?;
            b.open(TokenDesc::Args(name, vec![]), 999);

            return Ok(None);
        }

        if name == atom!("-") && matches!(self.peek()?, Token::Literal(l) if l.is_number()) {
            if let Token::Literal(literal) = self.next()? {
                return Ok(Some((b.heap.literal(negate(literal)), 0)));
            }
        }

        if let Some(desc) = lookup_op(b.op_dir, name, Fixity::Pre) {
            if desc.get_prec() <= b.max_prec() && self.next_starts_term(b.op_dir)? {
                let (_, right_max) = desc.arg_precs();
                b.open(TokenDesc::Prefix(name, desc.get_prec()), right_max);

                return Ok(None);
            }
        }

        if name == atom!("?") {
            if let Some(placeholders) = &mut self.placeholders {
                return match placeholders.pop_front() {
                    Some(arg) => Ok(Some((b.heap.build(&arg), 0))),
                    None => Err(ParserError::MissingPlaceholderArgument(
                        self.lexer.line_num,
                        self.lexer.col_num,
                    )),
                };
            }
        }

        Ok(Some((b.heap.atom(name), 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(src: &str) -> Result<Vec<Term>, ParserError> {
        let mut heap = Heap::new();
        let op_dir = default_op_dir();
        let mut parser = Parser::new(CharReader::new(src.as_bytes()));
        let mut terms = vec![];

        while !parser.eof()? {
            let t = parser.read_term(&mut heap, &op_dir)?;
            terms.push(heap.snapshot(t));
        }

        Ok(terms)
    }

    fn read_one(src: &str) -> Term {
        let mut terms = read_all(src).unwrap();
        assert_eq!(terms.len(), 1);
        terms.pop().unwrap()
    }

    #[test]
    fn facts_and_rules() {
        let terms = read_all("foo(a). bar(X) :- foo(X).").unwrap();

        assert_eq!(terms[0], Term::compound("foo", vec![Term::atom("a")]));
        assert!(terms[1].is_variant(&Term::compound(
            ":-",
            vec![
                Term::compound("bar", vec![Term::var("X")]),
                Term::compound("foo", vec![Term::var("X")]),
            ]
        )));
    }

    #[test]
    fn shared_variables_are_one_cell() {
        let mut heap = Heap::new();
        let op_dir = default_op_dir();
        let mut parser = Parser::new(CharReader::new("f(X, Y, X, _, _).".as_bytes()));

        let t = parser.read_term(&mut heap, &op_dir).unwrap();
        let args = heap.args(t).to_vec();

        assert_eq!(args[0], args[2]);
        assert_ne!(args[0], args[1]);
        assert_ne!(args[3], args[4]);
        assert_eq!(heap.var_name(args[0]).map(|name| &**name), Some("X"));
    }

    #[test]
    fn operator_precedence_and_associativity() {
        assert_eq!(
            read_one("a :- b, c ; d."),
            Term::compound(
                ":-",
                vec![
                    Term::atom("a"),
                    Term::compound(
                        ";",
                        vec![
                            Term::compound(",", vec![Term::atom("b"), Term::atom("c")]),
                            Term::atom("d"),
                        ]
                    ),
                ]
            )
        );

        assert_eq!(
            read_one("x = 1 - 2 - 3."),
            Term::compound(
                "=",
                vec![
                    Term::atom("x"),
                    Term::compound(
                        "-",
                        vec![
                            Term::compound("-", vec![Term::int(1), Term::int(2)]),
                            Term::int(3),
                        ]
                    ),
                ]
            )
        );
    }

    #[test]
    fn prefix_operators() {
        assert_eq!(
            read_one(":- dynamic foo/1."),
            Term::compound(
                ":-",
                vec![Term::compound(
                    "dynamic",
                    vec![Term::indicator(atom!("foo"), 1)]
                )]
            )
        );

        assert_eq!(
            read_one("x = - ."),
            Term::compound("=", vec![Term::atom("x"), Term::atom("-")])
        );
    }

    #[test]
    fn negative_numbers() {
        assert_eq!(read_one("f(-1, - 2.5, 3-1)."), {
            Term::compound(
                "f",
                vec![
                    Term::int(-1),
                    Term::float(-2.5),
                    Term::compound("-", vec![Term::int(3), Term::int(1)]),
                ],
            )
        });
    }

    #[test]
    fn lists_and_curly_terms() {
        let term = read_one("[a, b | T] = {c}.");

        assert!(term.is_variant(&Term::compound(
            "=",
            vec![
                Term::partial_list(vec![Term::atom("a"), Term::atom("b")], Term::var("T")),
                Term::compound("{}", vec![Term::atom("c")]),
            ]
        )));
    }

    #[test]
    fn double_quoted_text_is_chars_by_default() {
        assert_eq!(
            read_one("x(\"ab\")."),
            Term::compound(
                "x",
                vec![Term::list(vec![Term::atom("a"), Term::atom("b")])]
            )
        );
    }

    #[test]
    fn empty_argument_list_is_an_error() {
        match read_all("foo().") {
            Err(ParserError::UnexpectedToken(token, ..)) => assert_eq!(token, ")"),
            result => panic!("unexpected result {:?}", result),
        }
    }

    #[test]
    fn missing_end_is_unexpected_eof() {
        assert!(read_all("abc").unwrap_err().is_unexpected_eof());
    }

    #[test]
    fn placeholders_take_arguments_in_order() {
        let mut heap = Heap::new();
        let op_dir = default_op_dir();
        let mut parser = Parser::new(CharReader::new("foo(?, ?).".as_bytes()))
            .with_placeholders(vec![Term::atom("a"), Term::int(1)]);

        let t = parser.read_term(&mut heap, &op_dir).unwrap();

        assert_eq!(
            heap.snapshot(t),
            Term::compound("foo", vec![Term::atom("a"), Term::int(1)])
        );

        let mut parser = Parser::new(CharReader::new("foo(?, ?).".as_bytes()))
            .with_placeholders(vec![Term::atom("a")]);

        assert!(matches!(
            parser.read_term(&mut heap, &op_dir),
            Err(ParserError::MissingPlaceholderArgument(..))
        ));
    }

    #[test]
    fn long_conjunctions_and_deep_nesting() {
        let mut heap = Heap::new();
        let op_dir = default_op_dir();

        let body = vec!["true"; 5000].join(",");
        let src = format!("p :- {}.", body);
        let mut parser = Parser::new(CharReader::new(src.as_bytes()));

        let t = parser.read_term(&mut heap, &op_dir).unwrap();
        let mut goal = heap.args(t)[1];
        let mut goals = 1;

        while let TermView::Str(name, args) = heap.view(goal) {
            assert_eq!(name, atom!(","));
            goal = args[1];
            goals += 1;
        }

        assert_eq!(goals, 5000);

        let src = format!("x({}a{}).", "[".repeat(10000), "]".repeat(10000));
        let mut parser = Parser::new(CharReader::new(src.as_bytes()));
        assert!(parser.read_term(&mut heap, &op_dir).is_ok());

        let src = format!("x({}a{}).", "(".repeat(10000), ")".repeat(10000));
        let mut parser = Parser::new(CharReader::new(src.as_bytes()));
        let t = parser.read_term(&mut heap, &op_dir).unwrap();

        assert!(matches!(
            heap.view(heap.args(t)[0]),
            TermView::Literal(Literal::Atom(a)) if *a == atom!("a")
        ));
    }
}
