//! Compression utilities with algorithm auto-detection.
//!
//! Besides whole-buffer helpers, this module provides the streaming pieces the
//! parsers and pipeline sinks use: a reader that transparently decodes gzip or
//! zstd input, and a writer that encodes on the way out.

use std::io::{BufRead, BufReader, Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{BasepairError, Result};

/// Supported compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    Zstd,
    Gzip,
}

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Compress data using zstd at the given level (1–22).
pub fn zstd_compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    zstd::encode_all(data, level).map_err(|e| BasepairError::Compression(e.to_string()))
}

/// Compress data using gzip at the given level (0–9).
pub fn gzip_compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder
        .write_all(data)
        .map_err(|e| BasepairError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| BasepairError::Compression(e.to_string()))
}

/// Detect the compression algorithm from the magic bytes of `data`.
///
/// Returns `None` if the data does not match a known format.
pub fn detect_algorithm(data: &[u8]) -> Option<Algorithm> {
    if data.starts_with(&ZSTD_MAGIC) {
        Some(Algorithm::Zstd)
    } else if data.starts_with(&GZIP_MAGIC) {
        Some(Algorithm::Gzip)
    } else {
        None
    }
}

/// Wrap `reader` so that gzip or zstd input is decoded on the fly.
///
/// The first bytes are peeked to pick a decoder; anything else passes through
/// unchanged.
pub fn decompressing_reader<'a, R: Read + 'a>(reader: R) -> Result<Box<dyn BufRead + 'a>> {
    let mut buffered = BufReader::new(reader);
    let algorithm = detect_algorithm(buffered.fill_buf()?);
    Ok(match algorithm {
        Some(Algorithm::Gzip) => Box::new(BufReader::new(MultiGzDecoder::new(buffered))),
        Some(Algorithm::Zstd) => Box::new(BufReader::new(
            zstd::Decoder::with_buffer(buffered)
                .map_err(|e| BasepairError::Compression(e.to_string()))?,
        )),
        None => Box::new(buffered),
    })
}

/// A writer that optionally compresses everything written through it.
///
/// Call [`CompressedWriter::finish`] to flush trailers; dropping the writer
/// without finishing may leave a truncated stream.
pub enum CompressedWriter<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> CompressedWriter<W> {
    /// Create a writer using `algorithm` (or none) at `level`.
    ///
    /// `level` is clamped to the algorithm's valid range.
    pub fn new(inner: W, algorithm: Option<Algorithm>, level: i32) -> Result<Self> {
        Ok(match algorithm {
            None => Self::Plain(inner),
            Some(Algorithm::Gzip) => {
                Self::Gzip(GzEncoder::new(inner, Compression::new(level.clamp(0, 9) as u32)))
            }
            Some(Algorithm::Zstd) => Self::Zstd(
                zstd::Encoder::new(inner, level.clamp(1, 22))
                    .map_err(|e| BasepairError::Compression(e.to_string()))?,
            ),
        })
    }

    /// Flush any trailer and return the inner writer.
    pub fn finish(self) -> Result<W> {
        match self {
            Self::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Self::Gzip(enc) => enc
                .finish()
                .map_err(|e| BasepairError::Compression(e.to_string())),
            Self::Zstd(enc) => enc
                .finish()
                .map_err(|e| BasepairError::Compression(e.to_string())),
        }
    }
}

impl<W: Write> Write for CompressedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Zstd(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_zstd() {
        let compressed = zstd_compress(b"test", 3).unwrap();
        assert_eq!(detect_algorithm(&compressed), Some(Algorithm::Zstd));
    }

    #[test]
    fn test_detect_gzip() {
        let compressed = gzip_compress(b"test", 6).unwrap();
        assert_eq!(detect_algorithm(&compressed), Some(Algorithm::Gzip));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_algorithm(b"not compressed"), None);
        assert_eq!(detect_algorithm(b""), None);
    }

    #[test]
    fn test_reader_detects_whole_buffer_output() {
        let original = b">seq1\nATGC\n";
        for bytes in [zstd_compress(original, 3).unwrap(), gzip_compress(original, 6).unwrap()] {
            let mut out = Vec::new();
            decompressing_reader(bytes.as_slice()).unwrap().read_to_end(&mut out).unwrap();
            assert_eq!(out, original);
        }
    }

    #[test]
    fn test_reader_passes_plain_text_through() {
        let mut out = String::new();
        decompressing_reader(&b"@r1\nACGT\n+\nIIII\n"[..])
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "@r1\nACGT\n+\nIIII\n");
    }

    #[test]
    fn test_writer_roundtrip() {
        for algorithm in [None, Some(Algorithm::Gzip), Some(Algorithm::Zstd)] {
            let mut writer = CompressedWriter::new(Vec::new(), algorithm, 6).unwrap();
            writer.write_all(b"ACGTACGTACGT").unwrap();
            let bytes = writer.finish().unwrap();
            assert_eq!(detect_algorithm(&bytes), algorithm);

            let mut out = Vec::new();
            decompressing_reader(&bytes[..])
                .unwrap()
                .read_to_end(&mut out)
                .unwrap();
            assert_eq!(out, b"ACGTACGTACGT");
        }
    }
}
