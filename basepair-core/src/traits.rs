//! Core trait definitions shared by every record format.
//!
//! Parsers are single-pass: they own their byte source and never rewind.
//! Writers report the number of bytes they emitted so that pipeline sinks can
//! account for output without wrapping the underlying writer.

use std::io::Write;

use crate::Result;

/// A streaming, record-at-a-time parser.
///
/// Implementations follow one observable contract:
///
/// - [`header`](RecordParser::header) is idempotent and may be called before
///   or between calls to [`next_record`](RecordParser::next_record).
/// - `next_record` returns `Ok(None)` at end of input and keeps returning it.
/// - A parse failure is returned once; every later call yields `Ok(None)`.
pub trait RecordParser {
    /// The record type produced by this parser.
    type Record;
    /// File-level header. Formats without a header use `()`.
    type Header;

    /// Return the file header, parsing it on first use.
    fn header(&mut self) -> Result<Self::Header>;

    /// Return the next record, or `None` at end of input.
    fn next_record(&mut self) -> Result<Option<Self::Record>>;

    /// Parse up to `n` records. Reaching end of input early is not an error.
    fn parse_n(&mut self, n: usize) -> Result<Vec<Self::Record>> {
        let mut records = Vec::new();
        while records.len() < n {
            match self.next_record()? {
                Some(record) => records.push(record),
                None => break,
            }
        }
        Ok(records)
    }

    /// Parse every remaining record.
    fn parse_all(&mut self) -> Result<Vec<Self::Record>> {
        self.parse_n(usize::MAX)
    }

    /// Parse the header followed by every remaining record.
    fn parse_with_header(&mut self) -> Result<(Self::Header, Vec<Self::Record>)> {
        let header = self.header()?;
        let records = self.parse_all()?;
        Ok((header, records))
    }

    /// Borrow the parser as an iterator of `Result<Record>`.
    fn records(&mut self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records { parser: self }
    }
}

/// Iterator adapter returned by [`RecordParser::records`].
pub struct Records<'a, P> {
    parser: &'a mut P,
}

impl<P: RecordParser> Iterator for Records<'_, P> {
    type Item = Result<P::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_record().transpose()
    }
}

/// A value that can serialize itself to a byte sink.
pub trait WriteTo {
    /// Write `self` to `w`, returning the number of bytes written.
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize>;
}

impl WriteTo for () {
    fn write_to<W: Write + ?Sized>(&self, _w: &mut W) -> Result<usize> {
        Ok(0)
    }
}

/// Tracks end-of-input for a parser so that errors are terminal.
///
/// Wrap each raw read in [`EofLatch::guard`]: once it has seen `Ok(None)` or
/// an error, every later call short-circuits to `Ok(None)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EofLatch {
    done: bool,
}

impl EofLatch {
    /// Whether the parser has reached its terminal state.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Force the terminal state.
    pub fn finish(&mut self) {
        self.done = true;
    }

    /// Run `read` unless already finished, latching on EOF or error.
    pub fn guard<T>(&mut self, read: impl FnOnce() -> Result<Option<T>>) -> Result<Option<T>> {
        if self.done {
            return Ok(None);
        }
        let result = read();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }
}
