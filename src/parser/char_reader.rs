/*
 * CharReader decodes UTF-8 code points from a byte reader one at a time,
 * keeping a small stack of put-back characters so the lexer can peek and
 * retract without buffering the whole source.
 */

use smallvec::SmallVec;

use std::error::Error;
use std::fmt;
use std::io::{self, ErrorKind, Read};
use std::str;

/// An error raised when parsing a UTF-8 byte stream fails.
#[derive(Debug)]
pub struct BadUtf8Error {
    /// The bytes that could not be parsed as a code point.
    pub bytes: Vec<u8>,
}

impl Error for BadUtf8Error {}

impl fmt::Display for BadUtf8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bad UTF-8: {:?}", self.bytes)
    }
}

/// Peekable character input.
pub trait CharRead {
    /// The next character, without consuming it. `None` at end of stream.
    fn peek_char(&mut self) -> Option<io::Result<char>>;

    /// Returns `c` to the front of the stream.
    fn put_back_char(&mut self, c: char);

    /// Consumes the character last returned by `peek_char`.
    fn consume(&mut self);

    /// Consumes and returns the next character.
    fn read_char(&mut self) -> Option<io::Result<char>> {
        match self.peek_char() {
            Some(Ok(c)) => {
                self.consume();
                Some(Ok(c))
            }
            result => result,
        }
    }
}

/// A [`CharRead`] over any byte reader.
pub struct CharReader<R> {
    inner: R,
    pending: SmallVec<[char; 4]>,
}

impl<R> fmt::Debug for CharReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharReader")
            .field("pending", &self.pending)
            .finish()
    }
}

impl<R> CharReader<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> CharReader<R> {
        Self {
            inner,
            pending: SmallVec::new(),
        }
    }

    /// Unwraps the underlying reader, dropping any put-back characters.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[inline]
fn utf8_width(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}

impl<R: Read> CharReader<R> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];

        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn decode_char(&mut self) -> io::Result<Option<char>> {
        let first = match self.read_byte()? {
            Some(first) => first,
            None => return Ok(None),
        };

        let bad_utf8 = |bytes: &[u8]| {
            io::Error::new(
                ErrorKind::InvalidData,
                BadUtf8Error {
                    bytes: bytes.to_vec(),
                },
            )
        };

        let width = utf8_width(first).ok_or_else(|| bad_utf8(&[first]))?;

        let mut buf = [first, 0, 0, 0];
        self.inner.read_exact(&mut buf[1..width])?;

        match str::from_utf8(&buf[..width]) {
            Ok(s) => Ok(s.chars().next()),
            Err(_) => Err(bad_utf8(&buf[..width])),
        }
    }
}

impl<R: Read> CharRead for CharReader<R> {
    fn peek_char(&mut self) -> Option<io::Result<char>> {
        if let Some(&c) = self.pending.last() {
            return Some(Ok(c));
        }

        match self.decode_char() {
            Ok(Some(c)) => {
                self.pending.push(c);
                Some(Ok(c))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }

    #[inline]
    fn put_back_char(&mut self, c: char) {
        self.pending.push(c);
    }

    #[inline]
    fn consume(&mut self) {
        self.pending.pop();
    }
}
