//! Binary FASTQ ("blowq") for Nanopore reads.
//!
//! Nanopore read identifiers are UUIDs, so a read packs into a compact
//! length-prefixed record:
//!
//! ```text
//! uuid (16 bytes)
//! u32 little-endian   optionals length
//! "k=v k=v ..."       optionals, ASCII
//! u32 little-endian   payload length
//! payload             compress_dna_with_quality(sequence, quality)
//! ```
//!
//! Records are concatenated with no framing beyond their own length fields.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use basepair_core::{BasepairError, EofLatch, RecordParser, Result};
use basepair_seq::dna_compress::{compress_dna_with_quality, decompress_dna_with_quality};

use crate::fastq::FastqRead;

const UUID_LEN: usize = 16;

/// Parse a hyphenated UUID (`8-4-4-4-12` hex digits, either case).
pub fn parse_uuid(text: &str) -> Result<[u8; UUID_LEN]> {
    let groups: Vec<&str> = text.split('-').collect();
    let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    if lengths != [8, 4, 4, 4, 12] {
        return Err(BasepairError::InvalidInput(format!("invalid UUID: {text}")));
    }
    let mut out = [0u8; UUID_LEN];
    hex::decode_to_slice(groups.concat(), &mut out)
        .map_err(|_| BasepairError::InvalidInput(format!("invalid UUID: {text}")))?;
    Ok(out)
}

/// Format 16 bytes as a lowercase hyphenated UUID.
pub fn format_uuid(bytes: &[u8; UUID_LEN]) -> String {
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn encode_optionals(optionals: &BTreeMap<String, String>) -> Result<String> {
    let mut pairs = Vec::with_capacity(optionals.len());
    for (key, value) in optionals {
        if key.is_empty() || key.contains('=') || key.contains(char::is_whitespace) || value.contains(char::is_whitespace) {
            return Err(BasepairError::InvalidInput(format!(
                "optional {key:?}={value:?} cannot be stored in blowq"
            )));
        }
        pairs.push(format!("{key}={value}"));
    }
    Ok(pairs.join(" "))
}

fn decode_optionals(text: &str) -> Result<BTreeMap<String, String>> {
    text.split(' ')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| BasepairError::InvalidInput(format!("invalid optional pair: {pair}")))
        })
        .collect()
}

fn length_prefix(len: usize, what: &str) -> Result<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| BasepairError::InvalidInput(format!("{what} of {len} bytes does not fit a u32 length")))
}

/// Encode one read. The identifier must be a UUID; sequences containing
/// `N` use the five-letter alphabet.
pub fn encode_read(read: &FastqRead) -> Result<Vec<u8>> {
    let id = parse_uuid(&read.identifier)?;
    let optionals = encode_optionals(&read.optionals)?;
    let five_letter = read.sequence.contains('N');
    let payload = compress_dna_with_quality(&read.sequence, &read.quality, five_letter)?;

    let mut out = Vec::with_capacity(UUID_LEN + 8 + optionals.len() + payload.len());
    out.extend_from_slice(&id);
    out.extend_from_slice(&length_prefix(optionals.len(), "optionals")?);
    out.extend_from_slice(optionals.as_bytes());
    out.extend_from_slice(&length_prefix(payload.len(), "payload")?);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode exactly one record from `data`.
pub fn decode_read(data: &[u8]) -> Result<FastqRead> {
    let mut cursor = data;
    let read = read_one(&mut cursor)?
        .ok_or_else(|| BasepairError::InvalidInput("blowq record is empty".into()))?;
    if !cursor.is_empty() {
        return Err(BasepairError::InvalidInput(format!(
            "{} trailing bytes after blowq record",
            cursor.len()
        )));
    }
    Ok(read)
}

/// Encode `read` and write it to `w`, returning the bytes written.
pub fn write_read<W: Write + ?Sized>(w: &mut W, read: &FastqRead) -> Result<usize> {
    let encoded = encode_read(read)?;
    w.write_all(&encoded)?;
    Ok(encoded.len())
}

/// Read one record. `Ok(None)` on a clean end of input; a record cut short
/// is an `UnexpectedEof` IO error.
fn read_one<R: Read>(r: &mut R) -> Result<Option<FastqRead>> {
    let mut id = [0u8; UUID_LEN];
    let first = loop {
        match r.read(&mut id) {
            Ok(n) => break n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    };
    if first == 0 {
        return Ok(None);
    }
    r.read_exact(&mut id[first..])?;

    let optionals = read_block(r)?;
    let optionals = std::str::from_utf8(&optionals)
        .map_err(|_| BasepairError::InvalidInput("blowq optionals are not UTF-8".into()))?;
    let optionals = decode_optionals(optionals)?;

    let payload = read_block(r)?;
    let (sequence, quality) = decompress_dna_with_quality(&payload)?;

    Ok(Some(FastqRead {
        identifier: format_uuid(&id),
        optionals,
        sequence,
        quality,
    }))
}

fn read_block<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let mut len = [0u8; 4];
    r.read_exact(&mut len)?;
    let len = u64::from(u32::from_le_bytes(len));
    // Grow with the data actually present rather than trusting the prefix.
    let mut block = Vec::new();
    r.take(len).read_to_end(&mut block)?;
    if block.len() as u64 != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("blowq block declares {len} bytes, found {}", block.len()),
        )
        .into());
    }
    Ok(block)
}

/// Streaming parser over concatenated blowq records.
#[derive(Debug)]
pub struct BlowqParser<R> {
    reader: R,
    latch: EofLatch,
}

impl<R: BufRead> BlowqParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            latch: EofLatch::default(),
        }
    }
}

impl BlowqParser<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> RecordParser for BlowqParser<R> {
    type Record = FastqRead;
    type Header = ();

    fn header(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<FastqRead>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        let result = read_one(&mut self.reader);
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fastq::FastqParser;

    const ID: &str = "e3cc70d5-90ef-49b6-bbe1-cfef99537d73";

    fn mock_read() -> FastqRead {
        FastqRead::new(ID, "ACTG", "aaaa").with_optional("key", "value")
    }

    #[test]
    fn uuid_round_trip() {
        let bytes = parse_uuid("E3CC70D5-90EF-49B6-BBE1-CFEF99537D73").unwrap();
        assert_eq!(bytes[0], 0xe3);
        assert_eq!(format_uuid(&bytes), ID);
        assert!(parse_uuid("e3cc70d590ef49b6bbe1cfef99537d73").is_err());
        assert!(parse_uuid("g3cc70d5-90ef-49b6-bbe1-cfef99537d73").is_err());
    }

    #[test]
    fn layout() {
        let encoded = encode_read(&mock_read()).unwrap();
        assert_eq!(&encoded[..16], &parse_uuid(ID).unwrap());
        assert_eq!(&encoded[16..20], &9u32.to_le_bytes());
        assert_eq!(&encoded[20..29], b"key=value");
        let payload_len = u32::from_le_bytes(encoded[29..33].try_into().unwrap()) as usize;
        assert_eq!(encoded.len(), 33 + payload_len);
    }

    #[test]
    fn decodes_what_it_encodes() {
        let read = mock_read();
        let decoded = decode_read(&encode_read(&read).unwrap()).unwrap();
        assert_eq!(decoded, read);
    }

    #[test]
    fn nanopore_read_with_n() {
        let fastq = format!(
            "@{ID} runid=99790f25859e24307203c25273f3a8be8283e7eb read=13956 ch=53\n\
             GATGTGCGCCGTTCCANTTGCGACGTACTATAATCC\n+\n\
             $$&%&%#$)*59;/767C378411,***,('11<;:\n"
        );
        let read = FastqParser::new(fastq.as_bytes()).next_record().unwrap().unwrap();
        let decoded = decode_read(&encode_read(&read).unwrap()).unwrap();
        assert_eq!(decoded, read);
    }

    #[test]
    fn empty_optionals() {
        let read = FastqRead::new(ID, "ACGT", "IIII");
        let decoded = decode_read(&encode_read(&read).unwrap()).unwrap();
        assert!(decoded.optionals.is_empty());
    }

    #[test]
    fn empty_read_round_trips() {
        let read = FastqRead::new(ID, "", "");
        let decoded = decode_read(&encode_read(&read).unwrap()).unwrap();
        assert_eq!(decoded, read);
    }

    #[test]
    fn non_uuid_identifier_is_rejected() {
        let read = FastqRead::new("read_1", "ACGT", "IIII");
        assert!(matches!(encode_read(&read), Err(BasepairError::InvalidInput(_))));
    }

    #[test]
    fn optional_with_space_is_rejected() {
        let read = FastqRead::new(ID, "ACGT", "IIII").with_optional("note", "two words");
        assert!(encode_read(&read).is_err());
    }

    #[test]
    fn decode_rejects_empty_and_trailing_data() {
        assert!(decode_read(&[]).is_err());
        let mut encoded = encode_read(&mock_read()).unwrap();
        encoded.push(0);
        assert!(decode_read(&encoded).is_err());
    }

    #[test]
    fn parser_streams_records() {
        let second = FastqRead::new("00000000-0000-0000-0000-000000000001", "GGNN", "!!~~");
        let mut data = Vec::new();
        let n = write_read(&mut data, &mock_read()).unwrap();
        write_read(&mut data, &second).unwrap();
        assert_eq!(n, encode_read(&mock_read()).unwrap().len());

        let reads = BlowqParser::new(data.as_slice()).parse_all().unwrap();
        assert_eq!(reads, vec![mock_read(), second]);
    }

    #[test]
    fn empty_input_is_eof() {
        let mut parser = BlowqParser::new(&[][..]);
        assert!(parser.next_record().unwrap().is_none());
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        let mut parser = BlowqParser::new(&b"clearly not a valid encoded fastq read"[..]);
        assert!(parser.next_record().is_err());
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn truncated_record_is_unexpected_eof() {
        let encoded = encode_read(&mock_read()).unwrap();
        let mut parser = BlowqParser::new(&encoded[..encoded.len() - 1]);
        match parser.next_record() {
            Err(BasepairError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
    }
}
