use crate::atom_table::*;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use std::fmt;
use std::io::{Error as IOError, ErrorKind};

/// The specifier of an operator.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpDeclSpec {
    /// Non-associative infix.
    XFX,
    /// Right-associative infix.
    XFY,
    /// Left-associative infix.
    YFX,
    /// Non-associative postfix.
    XF,
    /// Associative postfix.
    YF,
    /// Non-associative prefix.
    FX,
    /// Associative prefix.
    FY,
}

pub use OpDeclSpec::*;

impl OpDeclSpec {
    /// The specifier as it is written in an `op/3` declaration.
    pub fn as_atom(self) -> Atom {
        match self {
            XFX => atom!("xfx"),
            XFY => atom!("xfy"),
            YFX => atom!("yfx"),
            XF => atom!("xf"),
            YF => atom!("yf"),
            FX => atom!("fx"),
            FY => atom!("fy"),
        }
    }

    /// Where the operator sits relative to its operands.
    pub fn fixity(self) -> Fixity {
        match self {
            XFY | XFX | YFX => Fixity::In,
            XF | YF => Fixity::Post,
            FX | FY => Fixity::Pre,
        }
    }
}

/// Operator position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    /// Infix.
    In,
    /// Postfix.
    Post,
    /// Prefix.
    Pre,
}

/// The priority and specifier of one operator definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDesc {
    prec: u16,
    spec: OpDeclSpec,
}

impl OpDesc {
    /// An operator of priority `prec`.
    #[inline]
    pub fn build_with(prec: u16, spec: OpDeclSpec) -> Self {
        OpDesc { prec, spec }
    }

    /// The priority of the operator.
    #[inline]
    pub fn get_prec(self) -> u16 {
        self.prec
    }

    /// The specifier of the operator.
    #[inline]
    pub fn get_spec(self) -> OpDeclSpec {
        self.spec
    }

    /// Maximum priorities of the left and right operands, in that order.
    /// The missing operand of a prefix or postfix operator is reported as 0.
    pub(crate) fn arg_precs(self) -> (u16, u16) {
        let p = self.prec;

        match self.spec {
            XFX => (p - 1, p - 1),
            XFY => (p - 1, p),
            YFX => (p, p - 1),
            XF => (p - 1, 0),
            YF => (p, 0),
            FX => (0, p - 1),
            FY => (0, p),
        }
    }
}

/// The operator table.
pub type OpDir = IndexMap<(Atom, Fixity), OpDesc, FxBuildHasher>;

/// Looks up the definition of `name` in one position.
#[inline]
pub fn lookup_op(op_dir: &OpDir, name: Atom, fixity: Fixity) -> Option<OpDesc> {
    op_dir.get(&(name, fixity)).copied()
}

/// Adds or replaces an operator definition. Priority 0 removes it.
pub fn add_op(op_dir: &mut OpDir, name: Atom, prec: u16, spec: OpDeclSpec) {
    if prec == 0 {
        op_dir.shift_remove(&(name, spec.fixity()));
    } else {
        op_dir.insert((name, spec.fixity()), OpDesc::build_with(prec, spec));
    }
}

/// The standard operator table, plus the declaration prefix operators.
pub fn default_op_dir() -> OpDir {
    let mut op_dir = OpDir::with_hasher(FxBuildHasher::default());

    let table: &[(&str, u16, OpDeclSpec)] = &[
        (":-", 1200, XFX),
        ("-->", 1200, XFX),
        (":-", 1200, FX),
        ("?-", 1200, FX),
        ("dynamic", 1150, FX),
        ("discontiguous", 1150, FX),
        ("initialization", 1150, FX),
        ("multifile", 1150, FX),
        (";", 1100, XFY),
        ("->", 1050, XFY),
        ("*->", 1050, XFY),
        (",", 1000, XFY),
        ("\\+", 900, FY),
        ("=", 700, XFX),
        ("\\=", 700, XFX),
        ("==", 700, XFX),
        ("\\==", 700, XFX),
        ("@<", 700, XFX),
        ("@>", 700, XFX),
        ("@=<", 700, XFX),
        ("@>=", 700, XFX),
        ("=..", 700, XFX),
        ("is", 700, XFX),
        ("=:=", 700, XFX),
        ("=\\=", 700, XFX),
        ("<", 700, XFX),
        (">", 700, XFX),
        ("=<", 700, XFX),
        (">=", 700, XFX),
        (":", 200, XFY),
        ("+", 500, YFX),
        ("-", 500, YFX),
        ("/\\", 500, YFX),
        ("\\/", 500, YFX),
        ("xor", 500, YFX),
        ("*", 400, YFX),
        ("/", 400, YFX),
        ("//", 400, YFX),
        ("rem", 400, YFX),
        ("mod", 400, YFX),
        ("div", 400, YFX),
        ("<<", 400, YFX),
        (">>", 400, YFX),
        ("**", 200, XFX),
        ("^", 200, XFY),
        ("-", 200, FY),
        ("+", 200, FY),
        ("\\", 200, FY),
    ];

    for &(name, prec, spec) in table {
        add_op(&mut op_dir, atom!(name), prec, spec);
    }

    op_dir
}

/// How double-quoted text is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DoubleQuotes {
    /// A list of one-character atoms.
    #[default]
    Chars,
    /// A list of character codes.
    Codes,
    /// An atom.
    Atom,
}

/// An error raised while reading a term.
#[derive(Debug)]
pub enum ParserError {
    /// A read on the underlying stream failed, or the stream ended inside a
    /// term.
    IO(IOError),
    /// An escape sequence was malformed.
    InvalidEscape(usize, usize),
    /// A float could not be parsed.
    LexicalError(lexical::Error),
    /// A quoted item was not closed.
    MissingQuote(usize, usize),
    /// More `?` placeholders appeared than arguments were supplied.
    MissingPlaceholderArgument(usize, usize),
    /// A character that cannot start any token.
    NonPrologChar(char, usize, usize),
    /// An integer literal could not be parsed.
    ParseBigInt(usize, usize),
    /// A token that cannot appear at this point of a term.
    UnexpectedToken(String, usize, usize),
}

impl ParserError {
    /// The line and column where the error was detected, if known.
    pub fn line_and_col_num(&self) -> Option<(usize, usize)> {
        match self {
            &ParserError::InvalidEscape(line_num, col_num)
            | &ParserError::MissingQuote(line_num, col_num)
            | &ParserError::MissingPlaceholderArgument(line_num, col_num)
            | &ParserError::NonPrologChar(_, line_num, col_num)
            | &ParserError::ParseBigInt(line_num, col_num)
            | &ParserError::UnexpectedToken(_, line_num, col_num) => Some((line_num, col_num)),
            _ => None,
        }
    }

    /// The ISO name of the error.
    pub fn as_atom(&self) -> Atom {
        match self {
            ParserError::IO(e) if e.kind() == ErrorKind::UnexpectedEof => {
                atom!("unexpected_end_of_file")
            }
            ParserError::IO(e) if e.kind() == ErrorKind::InvalidData => atom!("invalid_data"),
            ParserError::IO(_) => atom!("input_output_error"),
            ParserError::InvalidEscape(..) => atom!("invalid_escape_sequence"),
            ParserError::LexicalError(_) => atom!("lexical_error"),
            ParserError::MissingQuote(..) => atom!("missing_quote"),
            ParserError::MissingPlaceholderArgument(..) => atom!("missing_placeholder_argument"),
            ParserError::NonPrologChar(..) => atom!("non_prolog_character"),
            ParserError::ParseBigInt(..) => atom!("cannot_parse_big_int"),
            ParserError::UnexpectedToken(..) => atom!("unexpected_token"),
        }
    }

    /// The error raised when a stream ends inside a term.
    #[inline]
    pub fn unexpected_eof() -> Self {
        ParserError::IO(IOError::from(ErrorKind::UnexpectedEof))
    }

    /// True for [`ParserError::unexpected_eof`].
    #[inline]
    pub fn is_unexpected_eof(&self) -> bool {
        if let ParserError::IO(e) = self {
            e.kind() == ErrorKind::UnexpectedEof
        } else {
            false
        }
    }
}

impl From<IOError> for ParserError {
    #[inline]
    fn from(e: IOError) -> ParserError {
        ParserError::IO(e)
    }
}

impl From<lexical::Error> for ParserError {
    #[inline]
    fn from(e: lexical::Error) -> ParserError {
        ParserError::LexicalError(e)
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::IO(e) => write!(f, "{}", e),
            ParserError::LexicalError(e) => write!(f, "syntax error: {}", e),
            ParserError::NonPrologChar(c, ..) => {
                write!(f, "syntax error: unexpected character {:?}", c)?;
                self.fmt_position(f)
            }
            ParserError::UnexpectedToken(token, ..) => {
                write!(f, "syntax error: unexpected token `{}`", token)?;
                self.fmt_position(f)
            }
            _ => {
                write!(f, "syntax error: {}", self.as_atom())?;
                self.fmt_position(f)
            }
        }
    }
}

impl ParserError {
    fn fmt_position(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_and_col_num() {
            Some((line_num, col_num)) => write!(f, " at {}:{}", line_num + 1, col_num + 1),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ParserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParserError::IO(e) => Some(e),
            ParserError::LexicalError(e) => Some(e),
            _ => None,
        }
    }
}
