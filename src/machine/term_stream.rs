use crate::atom_table::*;
use crate::machine::heap::*;
use crate::machine::streams::*;
use crate::parser::ast::*;
use crate::parser::char_reader::*;
use crate::parser::parser::*;
use crate::types::*;

use std::fmt;
use std::io::Cursor;

/// The terms of one source, read lazily.
pub struct TermStream {
    source: Atom,
    parser: Parser<CharReader<Stream>>,
    at_start: bool,
}

impl fmt::Debug for TermStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermStream")
            .field("source", &self.source)
            .field("line_num", &self.parser.line_num())
            .finish()
    }
}

impl TermStream {
    /// Reads the terms of `stream`, named `source` in errors.
    pub fn new(source: Atom, stream: Stream, double_quotes: DoubleQuotes) -> Self {
        TermStream {
            source,
            parser: Parser::new(CharReader::new(stream)).with_double_quotes(double_quotes),
            at_start: true,
        }
    }

    /// Reads the terms of `text`.
    pub fn from_text(source: Atom, text: &str, double_quotes: DoubleQuotes) -> Self {
        let stream: Stream = Box::new(Cursor::new(text.as_bytes().to_vec()));
        TermStream::new(source, stream, double_quotes)
    }

    /// Substitutes the bare `?` atoms of the source with `args`, in order.
    pub fn with_placeholders(mut self, args: &[Term]) -> Self {
        self.parser = self.parser.with_placeholders(args.iter().cloned());
        self
    }

    /// The name of the source.
    #[inline]
    pub fn source(&self) -> Atom {
        self.source
    }

    /// The next term of the source, or `None` once only layout remains.
    pub fn next(
        &mut self,
        heap: &mut Heap,
        op_dir: &OpDir,
    ) -> Result<Option<TermRef>, ParserError> {
        if self.at_start {
            self.at_start = false;
            self.skip_shebang()?;
        }

        if self.parser.eof()? {
            return Ok(None);
        }

        self.parser.read_term(heap, op_dir).map(Some)
    }

    // a first line starting with #! belongs to the shell.
    fn skip_shebang(&mut self) -> Result<(), ParserError> {
        let reader = self.parser.reader_mut();

        match reader.peek_char() {
            Some(Ok('#')) => reader.consume(),
            Some(Err(e)) => return Err(ParserError::IO(e)),
            _ => return Ok(()),
        }

        match reader.peek_char() {
            Some(Ok('!')) => {}
            Some(Err(e)) => return Err(ParserError::IO(e)),
            _ => {
                reader.put_back_char('#');
                return Ok(());
            }
        }

        while let Some(c) = reader.read_char() {
            if c? == '\n' {
                break;
            }
        }

        Ok(())
    }
}
