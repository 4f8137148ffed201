//! Read demultiplexing by barcode.
//!
//! Barcodes are searched for near both ends of a read, on both strands, with
//! a score-only Smith-Waterman alignment (match +1, mismatch -1, gap -1). A
//! barcode is called only when its score clears [`SCORE_THRESHOLD`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;

use basepair_core::Result;

use crate::csv_records;
use crate::transform::reverse_complement;

/// Alignment score a barcode must exceed to be called.
pub const SCORE_THRESHOLD: i32 = 18;

/// Reads shorter than this are never classified.
pub const MINIMAL_READ_SIZE: usize = 200;

/// Bases searched at each end of a read.
pub const EDGE_CHECK_SIZE: usize = 120;

/// Best local alignment score of `query` anywhere in `target`.
pub fn local_alignment_score(target: &[u8], query: &[u8]) -> i32 {
    let mut previous = vec![0i32; query.len() + 1];
    let mut current = vec![0i32; query.len() + 1];
    let mut best = 0;
    for &t in target {
        for (j, &q) in query.iter().enumerate() {
            let diagonal = previous[j] + if t == q { 1 } else { -1 };
            let score = diagonal.max(previous[j + 1] - 1).max(current[j] - 1).max(0);
            current[j + 1] = score;
            best = best.max(score);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

#[derive(Debug, Default)]
struct TopRanked<'a> {
    barcode: Option<&'a str>,
    score: i32,
}

impl<'a> TopRanked<'a> {
    fn consider(&mut self, window: &[u8], barcode: &'a str) {
        let score = local_alignment_score(window, barcode.as_bytes());
        if score > self.score && score > SCORE_THRESHOLD {
            self.barcode = Some(barcode);
            self.score = score;
            return;
        }
        let complement = local_alignment_score(window, reverse_complement(barcode).as_bytes());
        if complement > self.score && complement > SCORE_THRESHOLD {
            self.barcode = Some(barcode);
            self.score = complement;
        }
    }
}

/// The first and last [`EDGE_CHECK_SIZE`] bases of an uppercased read.
fn read_edges(read: &str) -> Option<[Vec<u8>; 2]> {
    if read.len() < MINIMAL_READ_SIZE {
        return None;
    }
    let read = read.to_ascii_uppercase().into_bytes();
    let head = read[..EDGE_CHECK_SIZE].to_vec();
    let tail = read[read.len() - EDGE_CHECK_SIZE..].to_vec();
    Some([head, tail])
}

// ---------------------------------------------------------------------------
// Single barcodes
// ---------------------------------------------------------------------------

/// Named barcodes, searched in sorted sequence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleBarcodePrimerSet {
    names: BTreeMap<String, String>,
}

impl SingleBarcodePrimerSet {
    pub fn new<N: Into<String>, S: Into<String>>(barcodes: impl IntoIterator<Item = (N, S)>) -> Self {
        let names = barcodes
            .into_iter()
            .map(|(name, sequence)| (sequence.into(), name.into()))
            .collect();
        Self { names }
    }

    /// Load `name,sequence` rows. Rows with another field count are skipped.
    pub fn from_csv<R: Read>(input: R) -> Result<Self> {
        let mut set = Self::default();
        for record in csv_records::reader(input).into_records() {
            let record = record.map_err(csv_records::error)?;
            if record.len() == 2 {
                set.names.insert(record[1].to_string(), record[0].to_string());
            }
        }
        Ok(set)
    }

    pub fn barcodes(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn name_of(&self, sequence: &str) -> Option<&str> {
        self.names.get(sequence).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Name of the best-scoring barcode in `read`, if any clears the threshold.
pub fn single_barcode(read: &str, primers: &SingleBarcodePrimerSet) -> Option<String> {
    let edges = read_edges(read)?;
    let mut top = TopRanked::default();
    for window in &edges {
        for barcode in primers.barcodes() {
            top.consider(window, barcode);
        }
    }
    top.barcode
        .and_then(|barcode| primers.name_of(barcode))
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Dual barcodes
// ---------------------------------------------------------------------------

/// A well identified by the barcode pair flanking its reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualBarcode {
    pub name: String,
    pub forward: String,
    pub reverse: String,
}

/// A plate of dual-barcoded wells.
#[derive(Debug, Clone, Default)]
pub struct DualBarcodePrimerSet {
    wells: HashMap<(String, String), String>,
    forward: BTreeSet<String>,
    reverse: BTreeSet<String>,
}

impl DualBarcodePrimerSet {
    pub fn new(barcodes: impl IntoIterator<Item = DualBarcode>) -> Self {
        let mut set = Self::default();
        for barcode in barcodes {
            set.insert(barcode);
        }
        set
    }

    /// Load `well,forward,reverse` rows. Rows with another field count are
    /// skipped.
    pub fn from_csv<R: Read>(input: R) -> Result<Self> {
        let mut set = Self::default();
        for record in csv_records::reader(input).into_records() {
            let record = record.map_err(csv_records::error)?;
            if record.len() == 3 {
                set.insert(DualBarcode {
                    name: record[0].to_string(),
                    forward: record[1].to_string(),
                    reverse: record[2].to_string(),
                });
            }
        }
        Ok(set)
    }

    fn insert(&mut self, barcode: DualBarcode) {
        self.forward.insert(barcode.forward.clone());
        self.reverse.insert(barcode.reverse.clone());
        self.wells.insert((barcode.forward, barcode.reverse), barcode.name);
    }

    /// Well name for an exact barcode pair.
    pub fn well(&self, forward: &str, reverse: &str) -> Option<&str> {
        self.wells
            .get(&(forward.to_string(), reverse.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }
}

/// Well whose forward and reverse barcodes both rank first in `read`.
///
/// Forward and reverse barcodes are ranked independently; the call is the
/// well registered for the winning pair, or `None` when either side has no
/// winner or the pair is not on the plate.
pub fn dual_barcode(read: &str, primers: &DualBarcodePrimerSet) -> Option<String> {
    let edges = read_edges(read)?;
    let mut forward = TopRanked::default();
    let mut reverse = TopRanked::default();
    for window in &edges {
        for barcode in &primers.forward {
            forward.consider(window, barcode);
        }
        for barcode in &primers.reverse {
            reverse.consider(window, barcode);
        }
    }
    primers
        .well(forward.barcode?, reverse.barcode?)
        .map(str::to_string)
}
