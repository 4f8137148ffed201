//! Ligation fidelity of 4 bp Golden Gate overhangs.
//!
//! A [`FidelityTable`] holds empirical ligation counts between overhang
//! pairs. Counts are keyed so that `(o, o)` is the correct Watson-Crick
//! ligation of `o` with its partner, and `(o, p)` with `p != o` is a
//! mis-ligation of `o` with the partner of `p`.

use std::collections::HashMap;
use std::io::Read;

use basepair_core::{BasepairError, Result};

use crate::csv_records;
use crate::transform::{complement_base, is_palindromic, reverse_complement};

/// Length of every overhang the table knows about.
pub const OVERHANG_LENGTH: usize = 4;

type Overhang = [u8; OVERHANG_LENGTH];

fn overhang_key(overhang: &str) -> Option<Overhang> {
    let bytes = overhang.as_bytes();
    let mut key: Overhang = bytes.try_into().ok()?;
    key.make_ascii_uppercase();
    Some(key)
}

fn reverse_complement_key(key: Overhang) -> Overhang {
    let mut rc = key;
    rc.reverse();
    for b in &mut rc {
        *b = complement_base(*b);
    }
    rc
}

/// All 256 four-base overhangs in A, T, G, C enumeration order.
pub fn all_overhangs() -> impl Iterator<Item = String> {
    const BASES: [char; 4] = ['A', 'T', 'G', 'C'];
    (0..256usize).map(|i| {
        [i >> 6, i >> 4, i >> 2, i]
            .iter()
            .map(|&shift| BASES[shift & 3])
            .collect()
    })
}

/// Empirical overhang-pair ligation counts.
#[derive(Debug, Clone, Default)]
pub struct FidelityTable {
    counts: HashMap<(Overhang, Overhang), u32>,
}

impl FidelityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` ligations for the pair `(overhang, other)`.
    ///
    /// # Errors
    ///
    /// Returns [`BasepairError::InvalidInput`] unless both overhangs are
    /// exactly four bases.
    pub fn insert(&mut self, overhang: &str, other: &str, count: u32) -> Result<()> {
        let pair = overhang_key(overhang).zip(overhang_key(other)).ok_or_else(|| {
            BasepairError::InvalidInput(format!("overhangs must be 4 bp: {overhang}, {other}"))
        })?;
        self.counts.insert(pair, count);
        Ok(())
    }

    /// Ligation count for a pair; unknown pairs count zero.
    pub fn count(&self, overhang: &str, other: &str) -> u32 {
        overhang_key(overhang)
            .zip(overhang_key(other))
            .and_then(|pair| self.counts.get(&pair).copied())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Load the published square matrix layout.
    ///
    /// The first row lists column overhangs after a leading label cell; each
    /// following row starts with its overhang, then one count per column.
    /// A cell counts ligations of the row overhang with the column overhang,
    /// so the correct pairing sits at the column holding the row's reverse
    /// complement. Blank cells count zero.
    ///
    /// # Errors
    ///
    /// Fails on a missing header, a malformed overhang, a non-integer count,
    /// or a row wider than the header.
    pub fn from_csv<R: Read>(input: R) -> Result<Self> {
        let mut records = csv_records::reader(input).into_records();
        let header = match records.next() {
            Some(record) => record.map_err(csv_records::error)?,
            None => return Err(BasepairError::parse(1, "empty fidelity table")),
        };
        let columns = header
            .iter()
            .skip(1)
            .map(|cell| {
                overhang_key(cell)
                    .map(reverse_complement_key)
                    .ok_or_else(|| BasepairError::parse(1, format!("invalid overhang column: {cell:?}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table = Self::new();
        for record in records {
            let record = record.map_err(csv_records::error)?;
            let line = csv_records::line_of(&record);
            let mut cells = record.iter();
            let row_cell = cells.next().unwrap_or_default();
            if row_cell.is_empty() && record.len() == 1 {
                continue;
            }
            let row = overhang_key(row_cell)
                .ok_or_else(|| BasepairError::parse(line, format!("invalid overhang row: {row_cell:?}")))?;
            for (column, cell) in cells.enumerate() {
                let partner = columns
                    .get(column)
                    .ok_or_else(|| BasepairError::parse(line, "row has more cells than the header"))?;
                if cell.is_empty() {
                    continue;
                }
                let count: u32 = cell
                    .parse()
                    .map_err(|_| BasepairError::parse(line, format!("invalid count: {cell:?}")))?;
                if count > 0 {
                    table.counts.insert((row, *partner), count);
                }
            }
        }
        Ok(table)
    }

    /// Probability that every overhang in the set ligates only to its
    /// intended partner.
    ///
    /// For each overhang, the correct-ligation count is divided by the sum
    /// of its counts against every member of the set and every member's
    /// reverse complement; the ratios are multiplied. Overhangs with no
    /// cross-talk contribute a factor of one, so an empty or single-member
    /// set scores 1.
    pub fn set_efficiency<S: AsRef<str>>(&self, overhangs: &[S]) -> f64 {
        let mut efficiency = 1.0;
        for overhang in overhangs {
            let overhang = overhang.as_ref();
            let correct = u64::from(self.count(overhang, overhang));
            let total: u64 = overhangs
                .iter()
                .map(|other| {
                    let other = other.as_ref();
                    u64::from(self.count(overhang, other))
                        + u64::from(self.count(overhang, &reverse_complement(other)))
                })
                .sum();
            if total != correct {
                efficiency *= correct as f64 / total as f64;
            }
        }
        efficiency
    }

    /// Score every overhang that could extend `current`.
    ///
    /// Candidates exclude palindromes, members of `current` and reverse
    /// complements of members. Each score is the mean of the set efficiency
    /// with the candidate and with its reverse complement appended.
    pub fn next_overhangs<S: AsRef<str>>(&self, current: &[S]) -> Vec<(String, f64)> {
        let mut set: Vec<String> = current.iter().map(|o| o.as_ref().to_ascii_uppercase()).collect();
        let taken: Vec<String> = set
            .iter()
            .flat_map(|o| [o.clone(), reverse_complement(o)])
            .collect();

        let mut scored = Vec::new();
        for candidate in all_overhangs() {
            if taken.contains(&candidate) || is_palindromic(&candidate) {
                continue;
            }
            set.push(candidate.clone());
            let strand = self.set_efficiency(&set);
            set.pop();
            set.push(reverse_complement(&candidate));
            let complement = self.set_efficiency(&set);
            set.pop();
            scored.push((candidate, (strand + complement) / 2.0));
        }
        scored
    }

    /// The best single overhang to add to `current`, if any scores above 0.
    pub fn next_overhang<S: AsRef<str>>(&self, current: &[S]) -> Option<String> {
        let mut best: Option<(String, f64)> = None;
        for (candidate, score) in self.next_overhangs(current) {
            if score > best.as_ref().map_or(0.0, |(_, s)| *s) {
                best = Some((candidate, score));
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}
