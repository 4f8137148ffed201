//! DDIDX: a flat file of fixed-size index entries.
//!
//! Each entry is 32 bytes: a 16-byte identifier followed by the start
//! position and length of the indexed object as big-endian `u64`s.

use std::io::{self, Read, Write};

use basepair_core::{EofLatch, RecordParser, Result, WriteTo};

/// Size of one encoded [`Index`].
pub const INDEX_LEN: usize = 32;

/// Location of one object inside a larger file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Index {
    pub identifier: [u8; 16],
    pub start_position: u64,
    pub length: u64,
}

impl Index {
    pub fn to_bytes(&self) -> [u8; INDEX_LEN] {
        let mut out = [0u8; INDEX_LEN];
        out[..16].copy_from_slice(&self.identifier);
        out[16..24].copy_from_slice(&self.start_position.to_be_bytes());
        out[24..].copy_from_slice(&self.length.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; INDEX_LEN]) -> Self {
        let mut identifier = [0u8; 16];
        identifier.copy_from_slice(&bytes[..16]);
        let mut start = [0u8; 8];
        start.copy_from_slice(&bytes[16..24]);
        let mut length = [0u8; 8];
        length.copy_from_slice(&bytes[24..]);
        Self {
            identifier,
            start_position: u64::from_be_bytes(start),
            length: u64::from_be_bytes(length),
        }
    }
}

impl WriteTo for Index {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        w.write_all(&self.to_bytes())?;
        Ok(INDEX_LEN)
    }
}

/// Read one entry; `Ok(None)` when the input ends on an entry boundary.
fn read_index<R: Read>(r: &mut R) -> Result<Option<Index>> {
    let mut buf = [0u8; INDEX_LEN];
    let mut filled = 0;
    while filled < INDEX_LEN {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(None),
        INDEX_LEN => Ok(Some(Index::from_bytes(&buf))),
        n => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("truncated index entry: {n} of {INDEX_LEN} bytes"),
        )
        .into()),
    }
}

/// Read every entry until a clean end of input.
pub fn read_indexes<R: Read>(mut r: R) -> Result<Vec<Index>> {
    let mut indexes = Vec::new();
    while let Some(index) = read_index(&mut r)? {
        indexes.push(index);
    }
    Ok(indexes)
}

/// Streaming reader over DDIDX entries.
#[derive(Debug)]
pub struct DdidxParser<R> {
    reader: R,
    latch: EofLatch,
}

impl<R: Read> DdidxParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            latch: EofLatch::default(),
        }
    }
}

impl<R: Read> RecordParser for DdidxParser<R> {
    type Record = Index;
    type Header = ();

    fn header(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<Index>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        let result = read_index(&mut self.reader);
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}
