//! Packed DNA encoding with a self-describing header.
//!
//! Layout: `flag(1) || length(1|2|4, big-endian) || packed symbols`.
//!
//! The low two bits of `flag` give the length width (0 = u8, 1 = u16,
//! 2 = u32); the high nibble selects the alphabet. Symbols are packed from
//! the most significant bit of each byte and the final byte is zero-padded.
//!
//! | alphabet | bits | A   | T   | G   | C   | N   |
//! |----------|------|-----|-----|-----|-----|-----|
//! | 4-letter | 2    | 00  | 01  | 10  | 11  |     |
//! | 5-letter | 3    | 000 | 001 | 010 | 011 | 100 |

use basepair_core::radix::BASE94;
use basepair_core::{BasepairError, Result};

const FOUR_LETTER: u8 = 0x00;
const FIVE_LETTER: u8 = 0x10;

const SYMBOLS: &[u8; 5] = b"ATGCN";

/// Symbol code for a base, or an error naming the offending character.
#[inline]
fn encode_base(b: u8, five_letter: bool) -> Result<u8> {
    match b {
        b'A' => Ok(0),
        b'T' => Ok(1),
        b'G' => Ok(2),
        b'C' => Ok(3),
        b'N' if five_letter => Ok(4),
        _ => Err(BasepairError::InvalidInput(format!(
            "invalid character in DNA sequence: {}",
            b as char
        ))),
    }
}

#[inline]
fn bits_per_symbol(five_letter: bool) -> usize {
    if five_letter {
        3
    } else {
        2
    }
}

#[inline]
fn packed_len(symbols: usize, bits: usize) -> usize {
    (symbols * bits + 7) / 8
}

/// Compress an uppercase DNA sequence.
///
/// With `five_letter` set, `N` is accepted and every base takes three bits.
///
/// # Errors
///
/// Fails on any byte outside the chosen alphabet (lowercase included) and
/// on sequences longer than `u32::MAX`. An empty sequence packs to a bare
/// header with a zero length.
///
/// # Example
///
/// ```
/// use basepair_seq::dna_compress::{compress_dna, decompress_dna};
///
/// let packed = compress_dna("ATGC", false).unwrap();
/// assert_eq!(packed, vec![0x00, 4, 0b0001_1011]);
/// assert_eq!(decompress_dna(&packed).unwrap(), "ATGC");
/// ```
pub fn compress_dna(seq: &str, five_letter: bool) -> Result<Vec<u8>> {
    let len = seq.len();
    let alphabet = if five_letter { FIVE_LETTER } else { FOUR_LETTER };
    let mut out = if let Ok(n) = u8::try_from(len) {
        vec![alphabet, n]
    } else if let Ok(n) = u16::try_from(len) {
        let mut v = vec![alphabet | 0x01];
        v.extend_from_slice(&n.to_be_bytes());
        v
    } else if let Ok(n) = u32::try_from(len) {
        let mut v = vec![alphabet | 0x02];
        v.extend_from_slice(&n.to_be_bytes());
        v
    } else {
        return Err(BasepairError::InvalidInput(format!(
            "DNA sequence of length {len} is too long to compress"
        )));
    };

    let bits = bits_per_symbol(five_letter);
    let header = out.len();
    out.resize(header + packed_len(len, bits), 0);
    let body = &mut out[header..];

    let mut bit = 0usize;
    for b in seq.bytes() {
        let code = encode_base(b, five_letter)?;
        for k in (0..bits).rev() {
            if (code >> k) & 1 == 1 {
                body[bit / 8] |= 0x80 >> (bit % 8);
            }
            bit += 1;
        }
    }
    Ok(out)
}

/// Parsed header of a compressed DNA buffer.
struct Header {
    five_letter: bool,
    length: usize,
    header_len: usize,
}

fn read_header(data: &[u8]) -> Result<Header> {
    let flag = *data
        .first()
        .ok_or_else(|| BasepairError::Compression("compressed DNA is empty".into()))?;
    let five_letter = match flag & 0xF0 {
        FOUR_LETTER => false,
        FIVE_LETTER => true,
        _ => {
            return Err(BasepairError::Compression(format!(
                "invalid compressed DNA flag: {flag:#04x}"
            )))
        }
    };
    let width = match flag & 0x0F {
        0x00 => 1,
        0x01 => 2,
        0x02 => 4,
        _ => {
            return Err(BasepairError::Compression(format!(
                "invalid compressed DNA flag: {flag:#04x}"
            )))
        }
    };
    let bytes = data.get(1..1 + width).ok_or_else(|| {
        BasepairError::Compression("compressed DNA is truncated in its length field".into())
    })?;
    let length = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
    Ok(Header {
        five_letter,
        length,
        header_len: 1 + width,
    })
}

/// Split `data` into decoded DNA and any bytes that follow the packed body.
fn decompress_prefix(data: &[u8]) -> Result<(String, &[u8])> {
    let header = read_header(data)?;
    let bits = bits_per_symbol(header.five_letter);
    let body_len = packed_len(header.length, bits);
    let body = data
        .get(header.header_len..header.header_len + body_len)
        .ok_or_else(|| BasepairError::Compression("compressed DNA is truncated".into()))?;

    let mut seq = String::with_capacity(header.length);
    let mut bit = 0usize;
    for _ in 0..header.length {
        let mut code = 0u8;
        for _ in 0..bits {
            let set = body[bit / 8] & (0x80 >> (bit % 8)) != 0;
            code = (code << 1) | u8::from(set);
            bit += 1;
        }
        let symbol = SYMBOLS.get(usize::from(code)).ok_or_else(|| {
            BasepairError::Compression(format!("invalid symbol code {code} in compressed DNA"))
        })?;
        seq.push(*symbol as char);
    }
    Ok((seq, &data[header.header_len + body_len..]))
}

/// Decompress a buffer produced by [`compress_dna`].
pub fn decompress_dna(data: &[u8]) -> Result<String> {
    decompress_prefix(data).map(|(seq, _)| seq)
}

/// Compress a sequence and append its base94-decoded quality string.
///
/// # Errors
///
/// Fails when `quality` is not the same length as `seq`, or contains a
/// character outside `!`..=`~`.
pub fn compress_dna_with_quality(seq: &str, quality: &str, five_letter: bool) -> Result<Vec<u8>> {
    if seq.len() != quality.len() {
        return Err(BasepairError::InvalidInput(format!(
            "quality length {} does not match sequence length {}",
            quality.len(),
            seq.len()
        )));
    }
    let mut out = compress_dna(seq, five_letter)?;
    out.extend_from_slice(&BASE94.decode(quality)?);
    Ok(out)
}

/// Inverse of [`compress_dna_with_quality`], returning `(sequence, quality)`.
pub fn decompress_dna_with_quality(data: &[u8]) -> Result<(String, String)> {
    let (seq, rest) = decompress_prefix(data)?;
    Ok((seq, BASE94.encode(rest)))
}
