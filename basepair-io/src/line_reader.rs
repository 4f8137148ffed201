//! Bounded line reading shared by the text parsers.
//!
//! Every text format in this crate is line oriented. [`LineReader`] hands out
//! one line at a time with its terminator (`\n` or `\r\n`) removed, counts
//! lines for error messages, and refuses lines longer than the configured
//! maximum instead of buffering without bound.

use std::io::{BufRead, Read};

use basepair_core::{BasepairError, Result};

/// Default maximum line size for FASTA input.
pub const FASTA_MAX_LINE: usize = 64 * 1024;
/// Default maximum line size for GenBank input.
pub const GENBANK_MAX_LINE: usize = 64 * 1024;
/// Default maximum line size for SAM input.
pub const SAM_MAX_LINE: usize = 64 * 1024;
/// Default maximum line size for pileup input.
pub const PILEUP_MAX_LINE: usize = 64 * 1024;
/// Default maximum line size for FASTQ input. Nanopore reads can be long.
pub const FASTQ_MAX_LINE: usize = 8 * 1024 * 1024;
/// Default maximum line size for SLOW5 input, where a whole raw signal sits
/// on one line.
pub const SLOW5_MAX_LINE: usize = 128 * 1024 * 1024;

/// Tunables shared by every line-oriented parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParserOptions {
    /// Longest accepted line, excluding its terminator.
    pub max_line_size: usize,
}

impl ParserOptions {
    pub const fn new(max_line_size: usize) -> Self {
        Self { max_line_size }
    }

    pub const fn fasta() -> Self {
        Self::new(FASTA_MAX_LINE)
    }

    pub const fn fastq() -> Self {
        Self::new(FASTQ_MAX_LINE)
    }

    pub const fn genbank() -> Self {
        Self::new(GENBANK_MAX_LINE)
    }

    pub const fn sam() -> Self {
        Self::new(SAM_MAX_LINE)
    }

    pub const fn pileup() -> Self {
        Self::new(PILEUP_MAX_LINE)
    }

    pub const fn slow5() -> Self {
        Self::new(SLOW5_MAX_LINE)
    }
}

/// Reads terminator-stripped lines, enforcing a maximum line size.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    max_line_size: usize,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, max_line_size: usize) -> Self {
        Self {
            inner,
            max_line_size,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Number of the line most recently returned (1-based, 0 before any).
    pub fn line_number(&self) -> usize {
        self.line
    }

    pub fn max_line_size(&self) -> usize {
        self.max_line_size
    }

    /// Next line without its terminator, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// [`BasepairError::LineTooLong`] when a line exceeds the maximum,
    /// [`BasepairError::Parse`] for invalid UTF-8, and I/O errors verbatim.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        // Room for the longest legal line plus "\r\n".
        let limit = self.max_line_size as u64 + 2;
        let n = (&mut self.inner).take(limit).read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        if self.buf.len() > self.max_line_size {
            return Err(BasepairError::LineTooLong {
                line: self.line,
                limit: self.max_line_size,
            });
        }

        String::from_utf8(std::mem::take(&mut self.buf))
            .map(Some)
            .map_err(|_| BasepairError::parse(self.line, "invalid UTF-8"))
    }

    /// A parse error at the current line.
    pub fn error(&self, message: impl Into<String>) -> BasepairError {
        BasepairError::parse(self.line, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &str, max: usize) -> Result<Vec<String>> {
        let mut reader = LineReader::new(input.as_bytes(), max);
        let mut out = Vec::new();
        while let Some(line) = reader.read_line()? {
            out.push(line);
        }
        Ok(out)
    }

    #[test]
    fn strips_both_terminators() {
        assert_eq!(lines("a\r\nbb\nccc", 16).unwrap(), vec!["a", "bb", "ccc"]);
    }

    #[test]
    fn empty_lines_are_kept() {
        assert_eq!(lines("a\n\nb\n", 16).unwrap(), vec!["a", "", "b"]);
    }

    #[test]
    fn line_at_limit_is_accepted() {
        assert_eq!(lines("abcd\r\nef\n", 4).unwrap(), vec!["abcd", "ef"]);
    }

    #[test]
    fn line_over_limit_is_rejected() {
        let err = lines("ab\nabcde\n", 4).unwrap_err();
        assert!(matches!(err, BasepairError::LineTooLong { line: 2, limit: 4 }));

        let err = lines("abcdefgh", 4).unwrap_err();
        assert!(matches!(err, BasepairError::LineTooLong { line: 1, .. }));
    }

    #[test]
    fn counts_lines() {
        let mut reader = LineReader::new("x\ny\n".as_bytes(), 8);
        assert_eq!(reader.line_number(), 0);
        reader.read_line().unwrap();
        reader.read_line().unwrap();
        assert_eq!(reader.line_number(), 2);
        assert!(reader.read_line().unwrap().is_none());
        assert_eq!(reader.line_number(), 2);
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let mut reader = LineReader::new(&b"\xff\xfe\n"[..], 8);
        assert!(matches!(reader.read_line(), Err(BasepairError::Parse { line: 1, .. })));
    }

    #[test]
    fn default_limits() {
        assert_eq!(ParserOptions::fasta().max_line_size, 65_536);
        assert_eq!(ParserOptions::fastq().max_line_size, 8 * 1024 * 1024);
        assert_eq!(ParserOptions::slow5().max_line_size, 128 * 1024 * 1024);
    }
}
