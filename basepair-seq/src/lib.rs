//! Sequence algorithms for the basepair toolkit.
//!
//! - **Primitives**: [`reverse_complement`], [`rotate_to_least`], alphabets
//!   and strand-canonical k-mers ([`KmerIter`])
//! - **Seqhash v2**: [`hash2`] / [`encode_hash2`], a canonical 16-byte identifier
//! - **DNA compression**: 2-bit/3-bit packing with optional quality via
//!   [`compress_dna`]
//! - **Cloning**: restriction digests, ligation and Golden Gate
//!   ([`restriction`]), plus junction k-mers for sequencing QC
//! - **Synthesis**: overhang fidelity ([`FidelityTable`]) and fragment design
//!   ([`fragment`])
//! - **Read classification**: [`MegamashMap`] template matching and barcode
//!   demultiplexing ([`barcoding`])
//!
//! # Example
//!
//! ```
//! use basepair_seq::{encode_hash2, hash2, reverse_complement, SequenceType};
//!
//! assert_eq!(reverse_complement("ATGGC"), "GCCAT");
//!
//! let hash = hash2("TTAGCCCAT", SequenceType::Dna, true, true).unwrap();
//! assert_eq!(encode_hash2(&hash).unwrap(), "A_6VAbBfXD8BSZh2HJZqgGgR");
//! ```

pub mod alphabet;
pub mod barcoding;
mod csv_records;
pub mod dna_compress;
pub mod fidelity;
pub mod fragment;
pub mod kmer;
pub mod ligation_kmers;
pub mod megamash;
pub mod restriction;
pub mod seqhash;
pub mod transform;

pub use alphabet::{Alphabet, DnaAlphabet, DnaNAlphabet, NucleicAlphabet, ProteinAlphabet};
pub use transform::{complement, is_palindromic, reverse, reverse_complement, rotate_to_least, standardize_dna};
pub use kmer::{canonical_kmer, KmerIter};

pub use dna_compress::{compress_dna, compress_dna_with_quality, decompress_dna, decompress_dna_with_quality};
pub use seqhash::{decode_hash2, encode_hash2, hash2, hash2_fragment, SequenceType};

pub use restriction::{cut_with_enzyme, golden_gate, ligate, Enzyme, Fragment, Part};
pub use ligation_kmers::{find_kmer_overlaps, find_kmers, KmerOverlap};

pub use fidelity::FidelityTable;
pub use fragment::{block_fragment, recursive_fragment, Assembly, RecursiveFragmentOptions};

pub use megamash::{Match, MegamashMap, MegamashOptions};
pub use barcoding::{dual_barcode, single_barcode, DualBarcodePrimerSet, SingleBarcodePrimerSet};
