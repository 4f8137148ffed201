//! FASTA parser and writer.
//!
//! A record starts at a `>` line and runs until the next `>` line or end of
//! input. Lines starting with `;` are comments and blank lines are ignored.

use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use basepair_core::compress::decompressing_reader;
use basepair_core::{BasepairError, EofLatch, RecordParser, Result, WriteTo};

use crate::line_reader::{LineReader, ParserOptions};

/// Residues per line when writing.
pub const LINE_WIDTH: usize = 80;

/// A single FASTA record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastaRecord {
    pub identifier: String,
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(identifier: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            sequence: sequence.into(),
        }
    }
}

impl WriteTo for FastaRecord {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let sequence = self.sequence.as_bytes();
        let mut out = Vec::with_capacity(self.identifier.len() + sequence.len() + sequence.len() / LINE_WIDTH + 3);
        out.push(b'>');
        out.extend_from_slice(self.identifier.as_bytes());
        out.push(b'\n');
        for chunk in sequence.chunks(LINE_WIDTH) {
            out.extend_from_slice(chunk);
            out.push(b'\n');
        }
        w.write_all(&out)?;
        Ok(out.len())
    }
}

/// Streaming FASTA parser.
#[derive(Debug)]
pub struct FastaParser<R> {
    lines: LineReader<R>,
    next_identifier: Option<String>,
    latch: EofLatch,
}

impl<R: BufRead> FastaParser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParserOptions::fasta())
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self {
            lines: LineReader::new(reader, options.max_line_size),
            next_identifier: None,
            latch: EofLatch::default(),
        }
    }

    fn read_record(&mut self) -> Result<Option<FastaRecord>> {
        let identifier = match self.next_identifier.take() {
            Some(identifier) => identifier,
            None => loop {
                let Some(line) = self.lines.read_line()? else {
                    return Ok(None);
                };
                if line.trim().is_empty() || line.starts_with(';') {
                    continue;
                }
                match line.strip_prefix('>') {
                    Some(rest) => break rest.trim_end_matches(['\r', '\n']).to_string(),
                    None => return Err(self.lines.error("expected '>' at start of record")),
                }
            },
        };
        let header_line = self.lines.line_number();

        let mut sequence = String::new();
        while let Some(line) = self.lines.read_line()? {
            if let Some(rest) = line.strip_prefix('>') {
                self.next_identifier = Some(rest.trim_end_matches(['\r', '\n']).to_string());
                break;
            }
            if line.starts_with(';') {
                continue;
            }
            sequence.push_str(&line);
        }

        if sequence.is_empty() {
            return Err(BasepairError::parse(
                header_line,
                format!("record '{identifier}' has no sequence"),
            ));
        }
        Ok(Some(FastaRecord { identifier, sequence }))
    }
}

impl FastaParser<Box<dyn BufRead>> {
    /// Open a FASTA file, transparently decoding gzip or zstd.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(decompressing_reader(file)?))
    }
}

impl<R: BufRead> RecordParser for FastaParser<R> {
    type Record = FastaRecord;
    type Header = ();

    fn header(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<FastaRecord>> {
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
