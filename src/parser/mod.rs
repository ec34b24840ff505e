#[macro_use]
mod macros;

/// Operator tables, read flags and parser errors.
pub mod ast;
/// Buffered character input.
pub mod char_reader;
/// Tokens of standard syntax.
pub mod lexer;
/// The operator precedence parser.
#[allow(clippy::module_inception)]
pub mod parser;
