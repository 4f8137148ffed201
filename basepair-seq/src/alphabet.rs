//! Alphabet definitions for biological sequence validation.
//!
//! Each alphabet is a zero-sized marker type that implements [`Alphabet`],
//! defining the set of valid bytes (uppercase) for a sequence type.

/// Trait for biological sequence alphabets.
pub trait Alphabet: Clone + 'static {
    /// Human-readable name (e.g. "DNA").
    const NAME: &'static str;

    /// The set of valid bytes.
    const VALID_BYTES: &'static [u8];

    /// Check whether a byte is valid. No case folding is applied.
    fn is_valid(b: u8) -> bool {
        Self::VALID_BYTES.contains(&b)
    }

    /// The first byte of `seq` outside this alphabet, if any.
    fn first_invalid(seq: &[u8]) -> Option<u8> {
        seq.iter().copied().find(|&b| !Self::is_valid(b))
    }
}

/// Nucleic acids with IUPAC ambiguity codes, accepting both `T` and `U`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NucleicAlphabet;

impl Alphabet for NucleicAlphabet {
    const NAME: &'static str = "nucleic acid";
    const VALID_BYTES: &'static [u8] = b"ATUGCYRSWKMBDHVNZ";
}

/// Protein residues including selenocysteine, pyrrolysine, stop and ambiguity codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProteinAlphabet;

impl Alphabet for ProteinAlphabet {
    const NAME: &'static str = "protein";
    const VALID_BYTES: &'static [u8] = b"ACDEFGHIKLMNPQRSTVWYUO*BXZ";
}

/// Unambiguous uppercase DNA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DnaAlphabet;

impl Alphabet for DnaAlphabet {
    const NAME: &'static str = "DNA";
    const VALID_BYTES: &'static [u8] = b"ATGC";
}

/// Uppercase DNA plus `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DnaNAlphabet;

impl Alphabet for DnaNAlphabet {
    const NAME: &'static str = "DNA+N";
    const VALID_BYTES: &'static [u8] = b"ATGCN";
}
