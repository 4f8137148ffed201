//! Streaming record parsers and writers for the basepair toolkit.
//!
//! Every parser implements [`RecordParser`](basepair_core::RecordParser) and
//! every record implements [`WriteTo`](basepair_core::WriteTo). Formats sit
//! behind cargo features, all enabled by default:
//!
//! - **FASTA** (`fasta`) and **FASTQ** (`fastq`)
//! - **GenBank** (`genbank`) with a location grammar and writer
//! - **SAM** (`sam`) with header and alignment validation
//! - **SLOW5** (`slow5`) raw Nanopore signal
//! - **pileup** (`pileup`) with mutation calling
//! - **UniProt** XML (`uniprot`), one `<entry>` at a time
//! - **blowq** (`blowq`) binary FASTQ for UUID-named reads
//! - **DDIDX** (`ddidx`) fixed-width object index
//!
//! Text parsers read through [`LineReader`], which enforces the per-format
//! maximum line size in [`ParserOptions`].

pub mod line_reader;

pub use line_reader::{LineReader, ParserOptions};

#[cfg(feature = "fasta")]
pub mod fasta;

#[cfg(feature = "fastq")]
pub mod fastq;

#[cfg(feature = "genbank")]
pub mod genbank;

#[cfg(feature = "sam")]
pub mod sam;

#[cfg(feature = "slow5")]
pub mod slow5;

#[cfg(feature = "pileup")]
pub mod pileup;

#[cfg(feature = "uniprot")]
pub mod uniprot;

#[cfg(feature = "blowq")]
pub mod blowq;

#[cfg(feature = "ddidx")]
pub mod ddidx;

#[cfg(feature = "fasta")]
pub use fasta::{FastaParser, FastaRecord};
#[cfg(feature = "fastq")]
pub use fastq::{FastqParser, FastqRead};
#[cfg(feature = "genbank")]
pub use genbank::{GenbankParser, GenbankRecord};
#[cfg(feature = "sam")]
pub use sam::{Alignment, SamParser};
#[cfg(feature = "slow5")]
pub use slow5::{RawRead, Slow5Parser};
#[cfg(feature = "pileup")]
pub use pileup::{PileupLine, PileupParser};
#[cfg(feature = "uniprot")]
pub use uniprot::{Entry, UniProtParser};
#[cfg(feature = "blowq")]
pub use blowq::BlowqParser;
#[cfg(feature = "ddidx")]
pub use ddidx::{DdidxParser, Index};
