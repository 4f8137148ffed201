//! FASTQ parser and writer.
//!
//! Each read is the usual four-line unit. Tokens after the identifier on the
//! `@` line are read as `key=value` optionals, the way basecallers annotate
//! Nanopore reads (`runid=... ch=... barcode=...`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use basepair_core::compress::decompressing_reader;
use basepair_core::{BasepairError, EofLatch, RecordParser, Result, WriteTo};

use crate::line_reader::{LineReader, ParserOptions};

/// A single FASTQ read with Phred+33 quality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastqRead {
    pub identifier: String,
    /// Header annotations. Written back in key order.
    pub optionals: BTreeMap<String, String>,
    pub sequence: String,
    pub quality: String,
}

impl FastqRead {
    pub fn new(identifier: impl Into<String>, sequence: impl Into<String>, quality: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            optionals: BTreeMap::new(),
            sequence: sequence.into(),
            quality: quality.into(),
        }
    }

    /// A copy of this read with one more optional set.
    #[must_use]
    pub fn with_optional(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut read = self.clone();
        read.optionals.insert(key.into(), value.into());
        read
    }

    pub fn optional(&self, key: &str) -> Option<&str> {
        self.optionals.get(key).map(String::as_str)
    }

    /// Check that sequence and quality have the same length.
    pub fn validate(&self) -> Result<()> {
        if self.sequence.len() != self.quality.len() {
            return Err(BasepairError::validation(
                "quality",
                format!(
                    "read {}: sequence length ({}) does not match quality length ({})",
                    self.identifier,
                    self.sequence.len(),
                    self.quality.len()
                ),
            ));
        }
        Ok(())
    }
}

impl WriteTo for FastqRead {
    /// Write the read as four lines. Reads whose sequence and quality lengths
    /// differ are rejected before anything is written.
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        self.validate()?;
        let mut out = String::with_capacity(self.identifier.len() + 2 * self.sequence.len() + 8);
        out.push('@');
        out.push_str(&self.identifier);
        for (key, value) in &self.optionals {
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out.push('\n');
        out.push_str(&self.sequence);
        out.push_str("\n+\n");
        out.push_str(&self.quality);
        out.push('\n');
        w.write_all(out.as_bytes())?;
        Ok(out.len())
    }
}

/// Split an `@` header body into identifier and optionals.
fn parse_header(header: &str) -> (String, BTreeMap<String, String>) {
    let mut tokens = header.split_whitespace();
    let identifier = tokens.next().unwrap_or_default().to_string();
    let optionals = tokens
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    (identifier, optionals)
}

/// Streaming FASTQ parser.
#[derive(Debug)]
pub struct FastqParser<R> {
    lines: LineReader<R>,
    latch: EofLatch,
}

impl<R: BufRead> FastqParser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParserOptions::fastq())
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self {
            lines: LineReader::new(reader, options.max_line_size),
            latch: EofLatch::default(),
        }
    }

    fn required_line(&mut self, what: &str) -> Result<String> {
        match self.lines.read_line()? {
            Some(line) => Ok(line),
            None => Err(BasepairError::parse(
                self.lines.line_number() + 1,
                format!("unexpected end of input, expected {what}"),
            )),
        }
    }

    fn read_record(&mut self) -> Result<Option<FastqRead>> {
        let header = loop {
            match self.lines.read_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let Some(body) = header.strip_prefix('@') else {
            return Err(self.lines.error("expected '@' at start of read"));
        };
        let (identifier, optionals) = parse_header(body);
        if identifier.is_empty() {
            return Err(self.lines.error("read has no identifier"));
        }

        let sequence = self.required_line("sequence")?;
        let separator = self.required_line("'+' separator")?;
        if !separator.starts_with('+') {
            return Err(self.lines.error("expected '+' separator line"));
        }
        let quality = self.required_line("quality")?;
        if quality.len() != sequence.len() {
            return Err(self.lines.error(format!(
                "read {identifier}: sequence length ({}) does not match quality length ({})",
                sequence.len(),
                quality.len()
            )));
        }

        Ok(Some(FastqRead {
            identifier,
            optionals,
            sequence,
            quality,
        }))
    }
}

impl FastqParser<Box<dyn BufRead>> {
    /// Open a FASTQ file, transparently decoding gzip or zstd.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(decompressing_reader(file)?))
    }
}

impl<R: BufRead> RecordParser for FastqParser<R> {
    type Record = FastqRead;
    type Header = ();

    fn header(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<FastqRead>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        let result = self.read_record();
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}
