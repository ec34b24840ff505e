use crate::atom_table::*;
use crate::machine::heap::*;
use crate::parser::ast::*;
use crate::types::*;

use lazy_static::lazy_static;

use std::fmt;

lazy_static! {
    static ref DEFAULT_OP_DIR: OpDir = default_op_dir();
}

fn char_to_string(is_quoted: bool, c: char) -> String {
    match c {
        '\'' if is_quoted => "\\'".to_string(),
        '\n' if is_quoted => "\\n".to_string(),
        '\r' if is_quoted => "\\r".to_string(),
        '\t' if is_quoted => "\\t".to_string(),
        '\u{0b}' if is_quoted => "\\v".to_string(), // vertical tab
        '\u{0c}' if is_quoted => "\\f".to_string(), // form feed
        '\u{08}' if is_quoted => "\\b".to_string(), // backspace
        '\u{07}' if is_quoted => "\\a".to_string(), // alert
        '\\' if is_quoted => "\\\\".to_string(),
        ' ' | '\'' | '\n' | '\r' | '\t' | '\u{0b}' | '\u{0c}' | '\u{08}' | '\u{07}' | '"'
        | '\\' => c.to_string(),
        _ => {
            if c.is_whitespace() || c.is_control() {
                // print all other control and whitespace characters in hex.
                format!("\\x{:x}\\", c as u32)
            } else {
                c.to_string()
            }
        }
    }
}

fn non_quoted_graphic_token<Iter: Iterator<Item = char>>(mut iter: Iter, c: char) -> bool {
    if c == '/' {
        match iter.next() {
            None => true,
            Some('*') => false, // a leading comment token must be quoted.
            Some(c) => graphic_token_char!(c) && iter.all(|c| graphic_token_char!(c)),
        }
    } else if c == '.' {
        match iter.next() {
            None => false,
            Some(c) => graphic_token_char!(c) && iter.all(|c| graphic_token_char!(c)),
        }
    } else {
        iter.all(|c| graphic_token_char!(c))
    }
}

/// True if the atom can be written without quotes and read back unchanged.
pub(crate) fn non_quoted_token<Iter: Iterator<Item = char>>(mut iter: Iter) -> bool {
    if let Some(c) = iter.next() {
        if small_letter_char!(c) {
            iter.all(|c| alpha_numeric_char!(c))
        } else if graphic_token_char!(c) {
            non_quoted_graphic_token(iter, c)
        } else if semicolon_char!(c) || cut_char!(c) {
            iter.next().is_none()
        } else if c == '[' {
            iter.next() == Some(']') && iter.next().is_none()
        } else if c == '{' {
            iter.next() == Some('}') && iter.next().is_none()
        } else {
            false
        }
    } else {
        false
    }
}

/// Writes `atom`, quoting it if it would not otherwise read back as itself.
pub fn fmt_atom(atom: Atom, quoted: bool, out: &mut String) {
    let name = atom.as_str();

    if !quoted || non_quoted_token(name.chars()) {
        out.push_str(name);
    } else {
        out.push('\'');

        for c in name.chars() {
            out.push_str(&char_to_string(true, c));
        }

        out.push('\'');
    }
}

fn fmt_float(n: f64, out: &mut String) {
    let s = format!("{:?}", n);

    // floats must carry a fraction to read back as floats.
    match s.find('e') {
        Some(e) if !s[..e].contains('.') => {
            out.push_str(&s[..e]);
            out.push_str(".0");
            out.push_str(&s[e..]);
        }
        _ => out.push_str(&s),
    }
}

fn requires_space(prev: Option<char>, next: Option<char>) -> bool {
    match (prev, next) {
        (Some(a), Some(b)) => {
            (alpha_numeric_char!(a) && alpha_numeric_char!(b))
                || (graphic_token_char!(a) && graphic_token_char!(b))
        }
        _ => false,
    }
}

/// A pending piece of output: text to emit, or a subterm still to be
/// written at a maximum priority.
#[derive(Debug, Clone, Copy)]
enum TokenOrRedirect {
    Atom(Atom),
    /// An infix operator and its priority.
    Op(Atom, u16),
    Punct(&'static str),
    Redirect(TermRef, u16),
}

/// Writes terms in standard syntax, using an operator table to write
/// operator applications in operator notation.
#[derive(Debug, Clone, Copy)]
pub struct TermWriter<'a> {
    op_dir: &'a OpDir,
    quoted: bool,
}

impl<'a> TermWriter<'a> {
    /// A writer quoting atoms as needed, using `op_dir`.
    pub fn new(op_dir: &'a OpDir) -> Self {
        TermWriter {
            op_dir,
            quoted: true,
        }
    }

    /// Sets whether atoms are quoted where needed.
    pub fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    /// Writes the term at `t` at the top priority.
    pub fn print(&self, heap: &Heap, t: TermRef) -> String {
        let mut out = String::new();
        let mut state_stack = vec![TokenOrRedirect::Redirect(t, 1200)];

        while let Some(item) = state_stack.pop() {
            match item {
                TokenOrRedirect::Atom(atom) => self.write_atom(atom, &mut out),
                TokenOrRedirect::Op(name, prec) => self.write_infix_op(name, prec, &mut out),
                TokenOrRedirect::Punct(text) => out.push_str(text),
                TokenOrRedirect::Redirect(t, max_prec) => {
                    self.write_term(heap, t, max_prec, &mut state_stack, &mut out)
                }
            }
        }

        out
    }

    fn push_token(&self, token: &str, out: &mut String) {
        if requires_space(out.chars().last(), token.chars().next()) {
            out.push(' ');
        }

        out.push_str(token);
    }

    fn write_atom(&self, atom: Atom, out: &mut String) {
        let mut token = String::new();
        fmt_atom(atom, self.quoted, &mut token);
        self.push_token(&token, out);
    }

    fn write_infix_op(&self, name: Atom, prec: u16, out: &mut String) {
        if name == atom!(",") {
            out.push_str(", ");
        } else if prec >= 1000 {
            out.push(' ');
            fmt_atom(name, self.quoted, out);
            out.push(' ');
        } else {
            self.write_atom(name, out);
        }
    }

    fn is_op(&self, atom: Atom) -> bool {
        [Fixity::In, Fixity::Pre, Fixity::Post]
            .iter()
            .any(|&fixity| lookup_op(self.op_dir, atom, fixity).is_some())
    }

    // writes an atomic term directly, or schedules the parts of a compound
    // on `state_stack`.
    fn write_term(
        &self,
        heap: &Heap,
        t: TermRef,
        max_prec: u16,
        state_stack: &mut Vec<TokenOrRedirect>,
        out: &mut String,
    ) {
        match heap.view(t) {
            TermView::Var(v) => {
                let name = match heap.var_name(v) {
                    Some(name) if &**name != "_" => name.to_string(),
                    _ => format!("_{}", v.index()),
                };

                self.push_token(&name, out);
            }
            TermView::Literal(Literal::Atom(atom)) => {
                let atom = *atom;

                // operator atoms are bracketed as operands of other operators.
                let bracketed = self.is_op(atom) && max_prec < 999;

                if bracketed && atom != atom!("[]") && atom != atom!("{}") {
                    out.push('(');
                    self.write_atom(atom, out);
                    out.push(')');
                } else {
                    self.write_atom(atom, out);
                }
            }
            TermView::Literal(Literal::Fixnum(n)) => self.push_token(&n.to_string(), out),
            TermView::Literal(Literal::Integer(n)) => self.push_token(&n.to_string(), out),
            TermView::Literal(Literal::Float(n)) => {
                let mut token = String::new();
                fmt_float(n.into_inner(), &mut token);
                self.push_token(&token, out);
            }
            TermView::Str(name, args) => {
                let items = self.compound_items(heap, t, name, args, max_prec);
                state_stack.extend(items.into_iter().rev());
            }
        }
    }

    // the parts of a compound term, in output order.
    fn compound_items(
        &self,
        heap: &Heap,
        t: TermRef,
        name: Atom,
        args: &[TermRef],
        max_prec: u16,
    ) -> Vec<TokenOrRedirect> {
        use TokenOrRedirect::*;

        if name == atom!(".") && args.len() == 2 {
            return list_items(heap, t);
        }

        if name == atom!("{}") && args.len() == 1 {
            return vec![Punct("{"), Redirect(args[0], 1200), Punct("}")];
        }

        let operator_items = match *args {
            [left, right] => lookup_op(self.op_dir, name, Fixity::In).map(|desc| {
                let (left_max, right_max) = desc.arg_precs();

                (
                    desc.get_prec(),
                    vec![
                        Redirect(left, left_max),
                        Op(name, desc.get_prec()),
                        Redirect(right, right_max),
                    ],
                )
            }),
            [arg] => {
                let is_number =
                    matches!(heap.view(arg), TermView::Literal(literal) if literal.is_number());
                let is_sign = name == atom!("-") || name == atom!("+");

                // -(1) is not the same term as -1.
                let prefix = match lookup_op(self.op_dir, name, Fixity::Pre) {
                    Some(desc) if !(is_sign && is_number) => {
                        let (_, right_max) = desc.arg_precs();

                        Some((
                            desc.get_prec(),
                            vec![Atom(name), Punct(" "), Redirect(arg, right_max)],
                        ))
                    }
                    _ => None,
                };

                prefix.or_else(|| {
                    lookup_op(self.op_dir, name, Fixity::Post).map(|desc| {
                        let (left_max, _) = desc.arg_precs();

                        (
                            desc.get_prec(),
                            vec![Redirect(arg, left_max), Punct(" "), Atom(name)],
                        )
                    })
                })
            }
            _ => None,
        };

        if let Some((prec, mut items)) = operator_items {
            if prec > max_prec {
                items.insert(0, Punct("("));
                items.push(Punct(")"));
            }

            return items;
        }

        let mut items = Vec::with_capacity(2 * args.len() + 2);

        items.push(Atom(name));
        items.push(Punct("("));

        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                items.push(Punct(","));
            }

            items.push(Redirect(arg, 999));
        }

        items.push(Punct(")"));
        items
    }
}

fn list_items(heap: &Heap, t: TermRef) -> Vec<TokenOrRedirect> {
    use TokenOrRedirect::*;

    let (items, tail) = match heap.list_shape(t) {
        ListShape::Proper(items) => (items, None),
        ListShape::Partial(items, tail) | ListShape::Improper(items, tail) => (items, Some(tail)),
    };

    let mut out = Vec::with_capacity(2 * items.len() + 3);
    out.push(Punct("["));

    for (i, &item) in items.iter().enumerate() {
        if i > 0 {
            out.push(Punct(","));
        }

        out.push(Redirect(item, 999));
    }

    if let Some(tail) = tail {
        out.push(Punct("|"));
        out.push(Redirect(tail, 999));
    }

    out.push(Punct("]"));
    out
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut heap = Heap::new();
        let t = heap.build(self);

        f.write_str(&heap.format(t))
    }
}

impl Heap {
    /// Writes the term at `t` with the default operator table.
    pub fn format(&self, t: TermRef) -> String {
        TermWriter::new(&DEFAULT_OP_DIR).print(self, t)
    }
}

/// Writes the name of `atom`, quoted where needed.
pub fn quoted_atom(atom: Atom) -> String {
    let mut out = String::new();
    fmt_atom(atom, true, &mut out);
    out
}
