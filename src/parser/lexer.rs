use crate::atom_table::*;
use crate::parser::ast::*;
use crate::parser::char_reader::*;
use crate::types::*;

use dashu::Integer;

use std::fmt;
use std::mem;

/// A token of standard syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An atom or a number.
    Literal(Literal),
    /// A variable name.
    Var(String),
    /// `"..."`
    String(String),
    /// `` `...` ``
    BackQuotedString(String),
    /// `(` after layout.
    Open,
    /// `(` directly after the previous token.
    OpenCT,
    /// `)`
    Close,
    /// `[`
    OpenList,
    /// `]`
    CloseList,
    /// `{`
    OpenCurly,
    /// `}`
    CloseCurly,
    /// `|`
    HeadTailSeparator,
    /// `,`
    Comma,
    /// The end token, `.` followed by layout.
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(Literal::Atom(name)) => write!(f, "{}", name),
            Token::Literal(Literal::Fixnum(n)) => write!(f, "{}", n),
            Token::Literal(Literal::Integer(n)) => write!(f, "{}", n),
            Token::Literal(Literal::Float(n)) => write!(f, "{}", n),
            Token::Var(name) => write!(f, "{}", name),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::BackQuotedString(s) => write!(f, "`{}`", s),
            Token::Open | Token::OpenCT => write!(f, "("),
            Token::Close => write!(f, ")"),
            Token::OpenList => write!(f, "["),
            Token::CloseList => write!(f, "]"),
            Token::OpenCurly => write!(f, "{{"),
            Token::CloseCurly => write!(f, "}}"),
            Token::HeadTailSeparator => write!(f, "|"),
            Token::Comma => write!(f, ","),
            Token::End => write!(f, "."),
        }
    }
}

enum QuotedItem {
    Char(char),
    Continuation,
    End,
}

/// Splits a character stream into tokens, tracking the position reached.
pub struct Lexer<R> {
    pub(crate) reader: R,
    pub(crate) line_num: usize,
    pub(crate) col_num: usize,
    // layout was skipped by `eof` since the last token.
    layout_inserted: bool,
}

impl<R> fmt::Debug for Lexer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexer")
            .field("line_num", &self.line_num)
            .field("col_num", &self.col_num)
            .finish()
    }
}

impl<R: CharRead> Lexer<R> {
    /// A lexer at the start of `src`.
    pub fn new(src: R) -> Self {
        Lexer {
            reader: src,
            line_num: 0,
            col_num: 0,
            layout_inserted: false,
        }
    }

    fn peek(&mut self) -> Result<Option<char>, ParserError> {
        match self.reader.peek_char() {
            None => Ok(None),
            Some(Ok(c)) => Ok(Some(c)),
            Some(Err(e)) => Err(ParserError::IO(e)),
        }
    }

    /// The next character, without consuming it. Fails at end of stream.
    pub fn lookahead_char(&mut self) -> Result<char, ParserError> {
        self.peek()?.ok_or_else(ParserError::unexpected_eof)
    }

    #[inline(always)]
    fn return_char(&mut self, c: char) {
        self.reader.put_back_char(c);
    }

    /// Consumes `c`, the lookahead character.
    pub fn skip_char(&mut self, c: char) {
        self.reader.consume();

        if new_line_char!(c) {
            self.line_num += 1;
            self.col_num = 0;
        } else {
            self.col_num += 1;
        }
    }

    fn single_line_comment(&mut self) -> Result<(), ParserError> {
        while let Some(c) = self.peek()? {
            self.skip_char(c);

            if new_line_char!(c) {
                break;
            }
        }

        Ok(())
    }

    fn bracketed_comment(&mut self) -> Result<bool, ParserError> {
        // the lookahead char is comment_1_char.
        self.skip_char('/');

        match self.peek()? {
            Some(c) if comment_2_char!(c) => {
                self.skip_char(c);
            }
            _ => {
                self.return_char('/');
                return Ok(false);
            }
        }

        let mut last = ' ';

        loop {
            let c = self.lookahead_char()?;
            self.skip_char(c);

            if comment_2_char!(last) && comment_1_char!(c) {
                return Ok(true);
            }

            last = c;
        }
    }

    /// Skips layout and comments, returning true if any were found.
    pub fn scan_for_layout(&mut self) -> Result<bool, ParserError> {
        let mut inserted = false;

        loop {
            match self.peek()? {
                Some(c) if layout_char!(c) => {
                    self.skip_char(c);
                }
                Some(c) if end_line_comment_char!(c) => {
                    self.single_line_comment()?;
                }
                Some(c) if comment_1_char!(c) => {
                    if !self.bracketed_comment()? {
                        break;
                    }
                }
                _ => break,
            }

            inserted = true;
        }

        Ok(inserted)
    }

    /// True if only layout and comments remain.
    pub fn eof(&mut self) -> Result<bool, ParserError> {
        self.layout_inserted |= self.scan_for_layout()?;
        Ok(self.peek()?.is_none())
    }

    fn escape_sequence(&mut self, c: char) -> Result<char, ParserError> {
        let escaped = match c {
            'a' => '\u{07}', // alert
            'b' => '\u{08}', // backspace
            'v' => '\u{0b}', // vertical tab
            'f' => '\u{0c}', // form feed
            'e' => '\u{1b}', // escape
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            '\\' | '\'' | '"' | '`' => c,
            c if octal_digit_char!(c) => return self.numeric_escape(8),
            c if symbolic_hexadecimal_char!(c) => {
                self.skip_char(c);
                return self.numeric_escape(16);
            }
            _ => return Err(ParserError::InvalidEscape(self.line_num, self.col_num)),
        };

        self.skip_char(c);
        Ok(escaped)
    }

    fn numeric_escape(&mut self, radix: u32) -> Result<char, ParserError> {
        let mut token = String::with_capacity(8);

        loop {
            let c = self.lookahead_char()?;

            if c.is_digit(radix) {
                self.skip_char(c);
                token.push(c);
            } else if backslash_char!(c) {
                self.skip_char(c);
                break;
            } else {
                return Err(ParserError::InvalidEscape(self.line_num, self.col_num));
            }
        }

        u32::from_str_radix(&token, radix)
            .ok()
            .and_then(char::from_u32)
            .ok_or(ParserError::InvalidEscape(self.line_num, self.col_num))
    }

    fn quoted_item(&mut self, quote: char) -> Result<QuotedItem, ParserError> {
        let c = self.lookahead_char()?;

        if c == quote {
            self.skip_char(c);

            return if self.peek()? == Some(quote) {
                self.skip_char(quote);
                Ok(QuotedItem::Char(quote))
            } else {
                Ok(QuotedItem::End)
            };
        }

        if backslash_char!(c) {
            self.skip_char(c);
            let c = self.lookahead_char()?;

            if new_line_char!(c) {
                self.skip_char(c);
                return Ok(QuotedItem::Continuation);
            }

            return self.escape_sequence(c).map(QuotedItem::Char);
        }

        self.skip_char(c);
        Ok(QuotedItem::Char(c))
    }

    fn quoted_token(&mut self, quote: char) -> Result<String, ParserError> {
        self.skip_char(quote);
        let mut token = String::with_capacity(16);

        loop {
            match self.quoted_item(quote) {
                Ok(QuotedItem::Char(c)) => token.push(c),
                Ok(QuotedItem::Continuation) => {}
                Ok(QuotedItem::End) => return Ok(token),
                Err(e) if e.is_unexpected_eof() => {
                    return Err(ParserError::MissingQuote(self.line_num, self.col_num));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name_token(&mut self, c: char) -> Result<Token, ParserError> {
        let mut token = String::with_capacity(16);

        if small_letter_char!(c) {
            self.skip_char(c);
            token.push(c);

            while let Some(c) = self.peek()? {
                if alpha_numeric_char!(c) {
                    self.skip_char(c);
                    token.push(c);
                } else {
                    break;
                }
            }
        } else if graphic_token_char!(c) {
            self.skip_char(c);
            token.push(c);

            while let Some(c) = self.peek()? {
                if graphic_token_char!(c) {
                    self.skip_char(c);
                    token.push(c);
                } else {
                    break;
                }
            }
        } else if cut_char!(c) || semicolon_char!(c) {
            self.skip_char(c);
            token.push(c);
        } else if single_quote_char!(c) {
            token = self.quoted_token(c)?;
        } else {
            return Err(ParserError::NonPrologChar(c, self.line_num, self.col_num));
        }

        Ok(Token::Literal(Literal::Atom(Atom::build_with(&token))))
    }

    fn variable_token(&mut self) -> Result<Token, ParserError> {
        let mut s = String::with_capacity(16);

        while let Some(c) = self.peek()? {
            if alpha_numeric_char!(c) {
                self.skip_char(c);
                s.push(c);
            } else {
                break;
            }
        }

        Ok(Token::Var(s))
    }

    fn integer_literal(&self, token: &str, radix: u32) -> Result<Literal, ParserError> {
        match i64::from_str_radix(token, radix) {
            Ok(n) => Ok(Literal::Fixnum(n)),
            Err(_) => Integer::from_str_radix(token, radix)
                .map(Literal::from_integer)
                .map_err(|_| ParserError::ParseBigInt(self.line_num, self.col_num)),
        }
    }

    fn digits_into(&mut self, token: &mut String, radix: u32) -> Result<(), ParserError> {
        while let Some(c) = self.peek()? {
            if c.is_digit(radix) {
                self.skip_char(c);
                token.push(c);
            } else {
                break;
            }
        }

        Ok(())
    }

    fn char_code_token(&mut self) -> Result<Token, ParserError> {
        self.skip_char('\'');
        let c = self.lookahead_char()?;

        let code = if backslash_char!(c) {
            self.skip_char(c);
            let c = self.lookahead_char()?;
            self.escape_sequence(c)?
        } else if single_quote_char!(c) {
            self.skip_char(c);

            // 0''' reads as the quote character, as does 0''.
            if self.peek()? == Some('\'') {
                self.skip_char('\'');
            }

            c
        } else {
            self.skip_char(c);
            c
        };

        Ok(Token::Literal(Literal::Fixnum(code as i64)))
    }

    /// Reads a number beginning with the digit `leading_c`.
    pub fn number_token(&mut self, leading_c: char) -> Result<Token, ParserError> {
        self.skip_char(leading_c);

        if leading_c == '0' {
            match self.peek()? {
                Some(c) if single_quote_char!(c) => {
                    return self.char_code_token();
                }
                Some(c @ ('x' | 'o' | 'b')) => {
                    let radix = match c {
                        'x' => 16,
                        'o' => 8,
                        _ => 2,
                    };

                    self.skip_char(c);

                    match self.peek()? {
                        Some(d) if d.is_digit(radix) => {
                            let mut token = String::with_capacity(16);
                            self.digits_into(&mut token, radix)?;
                            return Ok(Token::Literal(self.integer_literal(&token, radix)?));
                        }
                        _ => {
                            self.return_char(c);
                            return Ok(Token::Literal(Literal::Fixnum(0)));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut token = String::with_capacity(16);
        token.push(leading_c);
        self.digits_into(&mut token, 10)?;

        if self.peek()?.map_or(false, |c| decimal_point_char!(c)) {
            self.skip_char('.');

            match self.peek()? {
                Some(d) if decimal_digit_char!(d) => {
                    token.push('.');
                    self.digits_into(&mut token, 10)?;

                    if let Some(e) = self.peek()?.filter(|&e| exponent_char!(e)) {
                        self.skip_char(e);
                        let mut exponent = String::from(e);

                        if let Some(s) = self.peek()?.filter(|&s| sign_char!(s)) {
                            self.skip_char(s);
                            exponent.push(s);
                        }

                        match self.peek()? {
                            Some(d) if decimal_digit_char!(d) => {
                                token.push_str(&exponent);
                                self.digits_into(&mut token, 10)?;
                            }
                            _ => {
                                for c in exponent.chars().rev() {
                                    self.return_char(c);
                                }
                            }
                        }
                    }

                    let n = lexical::parse::<f64, _>(token.as_bytes())?;
                    return Ok(Token::Literal(Literal::from(n)));
                }
                _ => {
                    self.return_char('.');
                }
            }
        }

        Ok(Token::Literal(self.integer_literal(&token, 10)?))
    }

    /// Skips layout and reads the next token.
    pub fn next_token(&mut self) -> Result<Token, ParserError> {
        let layout_inserted = mem::take(&mut self.layout_inserted) | self.scan_for_layout()?;
        let c = self.lookahead_char()?;

        if capital_letter_char!(c) || variable_indicator_char!(c) {
            return self.variable_token();
        }

        let punctuation = match c {
            ',' => Token::Comma,
            ')' => Token::Close,
            '(' if layout_inserted => Token::Open,
            '(' => Token::OpenCT,
            '[' => Token::OpenList,
            ']' => Token::CloseList,
            '{' => Token::OpenCurly,
            '}' => Token::CloseCurly,
            '|' => Token::HeadTailSeparator,
            '"' => return Ok(Token::String(self.quoted_token(c)?)),
            '`' => return Ok(Token::BackQuotedString(self.quoted_token(c)?)),
            '.' => {
                self.skip_char(c);

                match self.peek()? {
                    None => return Ok(Token::End),
                    Some(c) if layout_char!(c) || end_line_comment_char!(c) => {
                        return Ok(Token::End);
                    }
                    _ => {
                        self.return_char('.');
                        return self.name_token('.');
                    }
                }
            }
            c if decimal_digit_char!(c) => return self.number_token(c),
            c => return self.name_token(c),
        };

        self.skip_char(c);
        Ok(punctuation)
    }
}
