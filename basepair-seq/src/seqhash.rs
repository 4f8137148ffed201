//! Seqhash v2: a 16-byte content identifier for biological sequences.
//!
//! ```text
//! byte[0]      flag: vvvv c d tt
//! bytes[1..16] sha256(canonical)[..15]
//!              FRAGMENT: fwd i8 || rev i8 || sha256(canonical)[..13]
//! presented:   "<letter>_<base58(16 bytes)>"
//! ```
//!
//! The canonical form makes the hash independent of where a circular
//! sequence was opened and of which strand of a double-stranded sequence
//! was given.

use std::fmt;

use basepair_core::hash::sha256_prefix;
use basepair_core::radix::BASE58;
use basepair_core::{BasepairError, Result};

use crate::alphabet::{Alphabet, NucleicAlphabet, ProteinAlphabet};
use crate::transform::{reverse_complement, rotate_to_least};

/// Current seqhash version written into every flag.
pub const VERSION: u8 = 2;

const VERSION_SHIFT: u8 = 4;
const CIRCULAR_BIT: u8 = 1 << 3;
const DOUBLE_STRANDED_BIT: u8 = 1 << 2;
const TYPE_MASK: u8 = 0b11;

/// Molecule type encoded in the low two flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SequenceType {
    Dna = 0,
    Rna = 1,
    Protein = 2,
    Fragment = 3,
}

impl SequenceType {
    fn from_code(code: u8) -> Self {
        match code & TYPE_MASK {
            0 => Self::Dna,
            1 => Self::Rna,
            2 => Self::Protein,
            _ => Self::Fragment,
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dna => "DNA",
            Self::Rna => "RNA",
            Self::Protein => "PROTEIN",
            Self::Fragment => "FRAGMENT",
        };
        f.write_str(name)
    }
}

/// Decoded contents of a flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    pub version: u8,
    pub sequence_type: SequenceType,
    pub circular: bool,
    pub double_stranded: bool,
}

impl Flag {
    /// Pack into a single byte.
    pub fn encode(self) -> u8 {
        let mut flag = (self.version & 0x0F) << VERSION_SHIFT;
        if self.circular {
            flag |= CIRCULAR_BIT;
        }
        if self.double_stranded {
            flag |= DOUBLE_STRANDED_BIT;
        }
        flag | (self.sequence_type as u8 & TYPE_MASK)
    }

    /// Unpack a flag byte.
    pub fn decode(flag: u8) -> Self {
        Self {
            version: flag >> VERSION_SHIFT,
            sequence_type: SequenceType::from_code(flag),
            circular: flag & CIRCULAR_BIT != 0,
            double_stranded: flag & DOUBLE_STRANDED_BIT != 0,
        }
    }

    /// Presentation letter for this flag, if the combination is defined.
    pub fn letter(self) -> Option<char> {
        use SequenceType::{Dna, Fragment, Protein, Rna};
        let letter = match (self.sequence_type, self.circular, self.double_stranded) {
            (Dna, true, true) => 'A',
            (Dna, true, false) => 'B',
            (Dna, false, true) => 'C',
            (Dna, false, false) => 'D',
            (Rna, true, true) => 'E',
            (Rna, true, false) => 'F',
            (Rna, false, true) => 'G',
            (Rna, false, false) => 'H',
            (Protein, false, false) => 'I',
            (Protein, true, false) => 'J',
            (Fragment, false, false) => 'K',
            (Fragment, true, false) => 'L',
            (Fragment, false, true) => 'M',
            (Fragment, true, true) => 'N',
            (Protein, _, true) => return None,
        };
        Some(letter)
    }
}

fn invalid_letter(allowed: &[u8], kind: &str, letter: u8) -> BasepairError {
    BasepairError::InvalidInput(format!(
        "only letters {} are allowed for {kind}, got letter: {}",
        String::from_utf8_lossy(allowed),
        letter as char
    ))
}

/// Compute a v2 seqhash for a DNA, RNA or protein sequence.
///
/// The sequence is uppercased first; RNA has `U` replaced by `T` so the
/// payload matches the equivalent DNA and only the flag differs.
///
/// # Errors
///
/// Returns [`BasepairError::InvalidInput`] for letters outside the type's
/// alphabet, for double-stranded proteins, and for [`SequenceType::Fragment`]
/// (use [`hash2_fragment`]).
///
/// # Example
///
/// ```
/// use basepair_seq::seqhash::{encode_hash2, hash2, SequenceType};
///
/// let hash = hash2("TTAGCCCAT", SequenceType::Dna, true, true).unwrap();
/// assert_eq!(encode_hash2(&hash).unwrap(), "A_6VAbBfXD8BSZh2HJZqgGgR");
/// ```
pub fn hash2(
    sequence: &str,
    sequence_type: SequenceType,
    circular: bool,
    double_stranded: bool,
) -> Result<[u8; 16]> {
    let mut sequence = sequence.to_ascii_uppercase();
    match sequence_type {
        SequenceType::Dna | SequenceType::Rna => {
            if sequence_type == SequenceType::Rna {
                sequence = sequence.replace('U', "T");
            }
            if let Some(bad) = NucleicAlphabet::first_invalid(sequence.as_bytes()) {
                return Err(invalid_letter(NucleicAlphabet::VALID_BYTES, "DNA/RNA", bad));
            }
        }
        SequenceType::Protein => {
            if let Some(bad) = ProteinAlphabet::first_invalid(sequence.as_bytes()) {
                return Err(invalid_letter(ProteinAlphabet::VALID_BYTES, "proteins", bad));
            }
            if double_stranded {
                return Err(BasepairError::InvalidInput(
                    "proteins cannot be double stranded".into(),
                ));
            }
        }
        SequenceType::Fragment => {
            return Err(BasepairError::InvalidInput(
                "only sequence types DNA, RNA or PROTEIN are allowed, use hash2_fragment for fragments".into(),
            ))
        }
    }

    let canonical = match (circular, double_stranded) {
        (true, true) => {
            let forward = rotate_to_least(&sequence);
            let reverse = rotate_to_least(&reverse_complement(&sequence));
            forward.min(reverse)
        }
        (true, false) => rotate_to_least(&sequence),
        (false, true) => {
            let reverse = reverse_complement(&sequence);
            sequence.min(reverse)
        }
        (false, false) => sequence,
    };

    let flag = Flag {
        version: VERSION,
        sequence_type,
        circular,
        double_stranded,
    };
    let mut result = [0u8; 16];
    result[0] = flag.encode();
    result[1..].copy_from_slice(&sha256_prefix::<15>(canonical.as_bytes()));
    Ok(result)
}

/// Compute a v2 seqhash for a linear fragment with sticky ends.
///
/// The strand whose sequence sorts first is hashed; when that is the
/// reverse complement, the overhang lengths swap places too.
pub fn hash2_fragment(sequence: &str, fwd_overhang: i8, rev_overhang: i8) -> Result<[u8; 16]> {
    if let Some(bad) = NucleicAlphabet::first_invalid(sequence.as_bytes()) {
        return Err(invalid_letter(NucleicAlphabet::VALID_BYTES, "DNA/RNA", bad));
    }
    let sequence = sequence.to_ascii_uppercase();
    let rc = reverse_complement(&sequence);
    let (canonical, forward, reverse) = if sequence > rc {
        (rc, rev_overhang, fwd_overhang)
    } else {
        (sequence, fwd_overhang, rev_overhang)
    };

    let flag = Flag {
        version: VERSION,
        sequence_type: SequenceType::Fragment,
        circular: false,
        double_stranded: false,
    };
    let mut result = [0u8; 16];
    result[0] = flag.encode();
    result[1] = forward as u8;
    result[2] = reverse as u8;
    result[3..].copy_from_slice(&sha256_prefix::<13>(canonical.as_bytes()));
    Ok(result)
}

/// Present a hash as `<letter>_<base58>`.
///
/// # Errors
///
/// Fails when the flag describes a combination with no presentation letter.
pub fn encode_hash2(hash: &[u8; 16]) -> Result<String> {
    let flag = Flag::decode(hash[0]);
    let letter = flag.letter().ok_or_else(|| {
        BasepairError::Hash(format!(
            "no seqhash letter for {} circular={} double_stranded={}",
            flag.sequence_type, flag.circular, flag.double_stranded
        ))
    })?;
    Ok(format!("{letter}_{}", BASE58.encode(hash)))
}

/// Parse a presented seqhash back into its 16 bytes.
pub fn decode_hash2(encoded: &str) -> Result<[u8; 16]> {
    let (_, body) = encoded
        .split_once('_')
        .ok_or_else(|| BasepairError::Hash("invalid encoded string format".into()))?;
    let bytes = BASE58.decode(body)?;
    <[u8; 16]>::try_from(bytes.as_slice()).map_err(|_| {
        BasepairError::Hash(format!(
            "decoded hash has {} bytes, expected 16",
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn presented(seq: &str, t: SequenceType, circular: bool, ds: bool) -> String {
        encode_hash2(&hash2(seq, t, circular, ds).unwrap()).unwrap()
    }

    #[test]
    fn known_presentations() {
        assert_eq!(presented("TTAGCCCAT", SequenceType::Dna, true, true), "A_6VAbBfXD8BSZh2HJZqgGgR");
        assert_eq!(presented("TTAGCCCAT", SequenceType::Dna, true, false), "B_5xKbuHELJCCQWJwQi7W1ak");
        assert_eq!(presented("TTAGCCCAT", SequenceType::Dna, false, true), "C_5Z2pHCXbxWUPYiZj6J1Nag");
        assert_eq!(presented("TTAGCCCAT", SequenceType::Dna, false, false), "D_4yT7etihWZHHNXUpbM5tUf");
        assert_eq!(presented("TTAGCCCAT", SequenceType::Rna, false, false), "H_56cWv4dacvRJxUUcXYsdP5");
        assert_eq!(presented("MGC*", SequenceType::Protein, false, false), "I_5DQsEyDHLh2r4njCcupAuF");
    }

    #[test]
    fn input_is_uppercased() {
        assert_eq!(
            hash2("ttagcccat", SequenceType::Dna, false, false).unwrap(),
            hash2("TTAGCCCAT", SequenceType::Dna, false, false).unwrap()
        );
    }

    #[test]
    fn invalid_inputs() {
        assert!(hash2("XTGGCCTAA", SequenceType::Dna, true, true).is_err());
        assert!(hash2("MGCJ*", SequenceType::Protein, false, false).is_err());
        assert!(hash2("MGCS*", SequenceType::Protein, false, true).is_err());
        assert!(hash2("ATGC", SequenceType::Fragment, false, false).is_err());
    }

    #[test]
    fn flag_layout() {
        let hash = hash2("ATGC", SequenceType::Rna, true, false).unwrap();
        assert_eq!(hash[0], 0b0010_1001);
        let flag = Flag::decode(hash[0]);
        assert_eq!(flag.version, 2);
        assert_eq!(flag.sequence_type, SequenceType::Rna);
        assert!(flag.circular);
        assert!(!flag.double_stranded);
    }

    #[test]
    fn fragment_is_strand_independent() {
        let forward = hash2_fragment("ATGGGCTAA", 4, 4).unwrap();
        let reverse = hash2_fragment("TTAGCCCAT", 4, 4).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(encode_hash2(&forward).unwrap(), "K_5KnZQEnPRzJSYPkbPwLCJF");
        assert!(hash2_fragment("ATGGGCTAX", 4, 4).is_err());
    }

    #[test]
    fn fragment_swaps_overhangs_with_strand() {
        let forward = hash2_fragment("ATGGGCTAA", 4, -2).unwrap();
        let reverse = hash2_fragment("TTAGCCCAT", -2, 4).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward[1], 4);
        assert_eq!(forward[2] as i8, -2);
    }

    #[test]
    fn decode_failures() {
        assert!(decode_hash2("").is_err());
        assert!(decode_hash2("A_").is_err());
        assert!(decode_hash2("A_/").is_err());
        assert!(decode_hash2("A_11111").is_err());
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrip(
            seq in "[ATGC]{1,60}",
            circular in any::<bool>(),
            ds in any::<bool>(),
        ) {
            let hash = hash2(&seq, SequenceType::Dna, circular, ds).unwrap();
            prop_assert_eq!(decode_hash2(&encode_hash2(&hash).unwrap()).unwrap(), hash);
        }

        #[test]
        fn circular_hash_ignores_rotation(seq in "[ATGC]{1,60}", shift in 0usize..60) {
            let rotated = crate::transform::rotate(&seq, shift);
            prop_assert_eq!(
                hash2(&seq, SequenceType::Dna, true, true).unwrap(),
                hash2(&rotated, SequenceType::Dna, true, true).unwrap()
            );
        }
    }
}
