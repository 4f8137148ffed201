//! Megamash: identify which known template a read came from.
//!
//! Every template is reduced to the canonical k-mers that no other template
//! shares. A read scores, per template, the fraction of that template's
//! unique k-mers it contains. Because only unique k-mers are kept, a read can
//! only score highly against the template it was actually sequenced from,
//! even when templates share long common regions (primers, backbones).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use basepair_core::{BasepairError, Result};

use crate::kmer::KmerIter;

/// Tunables for building a [`MegamashMap`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MegamashOptions {
    pub kmer_size: usize,
    /// Minimum unique k-mers every template must keep.
    pub minimal_kmer_count: usize,
    /// Scores must exceed this to be reported.
    pub threshold: f64,
}

impl Default for MegamashOptions {
    fn default() -> Self {
        Self {
            kmer_size: 16,
            minimal_kmer_count: 10,
            threshold: 0.2,
        }
    }
}

/// A template hit with its score in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub identifier: String,
    pub score: f64,
}

/// Unique canonical k-mers of a template set.
#[derive(Debug, Clone)]
pub struct MegamashMap {
    identifiers: Vec<String>,
    kmers: HashMap<Vec<u8>, usize>,
    kmer_counts: Vec<usize>,
    options: MegamashOptions,
}

impl MegamashMap {
    /// Build a map from `(identifier, sequence)` templates.
    ///
    /// Templates are uppercased. Canonical k-mers contributed by more than
    /// one template are discarded.
    ///
    /// # Errors
    ///
    /// [`BasepairError::InvalidInput`] for a zero k-mer size and
    /// [`BasepairError::Invariant`] when a template keeps fewer than
    /// `minimal_kmer_count` unique k-mers.
    ///
    /// # Example
    ///
    /// ```
    /// use basepair_seq::megamash::{MegamashMap, MegamashOptions};
    ///
    /// let options = MegamashOptions { kmer_size: 8, minimal_kmer_count: 2, threshold: 0.5 };
    /// let map = MegamashMap::new(
    ///     [("left", "ATGCGTACGTTAGCAT"), ("right", "GGCCTTAAGGCATCGA")],
    ///     options,
    /// )
    /// .unwrap();
    /// let matches = map.match_sequence("ggccttaaggcatcga");
    /// assert_eq!(matches[0].identifier, "right");
    /// assert_eq!(matches[0].score, 1.0);
    /// ```
    pub fn new<I, S>(templates: impl IntoIterator<Item = (I, S)>, options: MegamashOptions) -> Result<Self>
    where
        I: Into<String>,
        S: AsRef<str>,
    {
        let mut identifiers = Vec::new();
        let mut contributions: Vec<HashSet<Vec<u8>>> = Vec::new();
        let mut template_counts: HashMap<Vec<u8>, usize> = HashMap::new();

        for (identifier, sequence) in templates {
            let sequence = sequence.as_ref().to_ascii_uppercase();
            let kmers: HashSet<Vec<u8>> = KmerIter::new(sequence.as_bytes(), options.kmer_size)?
                .canonical()
                .collect();
            for kmer in &kmers {
                *template_counts.entry(kmer.clone()).or_default() += 1;
            }
            identifiers.push(identifier.into());
            contributions.push(kmers);
        }

        let mut kmers = HashMap::new();
        let mut kmer_counts = Vec::with_capacity(identifiers.len());
        for (index, contributed) in contributions.into_iter().enumerate() {
            let mut unique = 0;
            for kmer in contributed {
                if template_counts.get(&kmer) == Some(&1) {
                    kmers.insert(kmer, index);
                    unique += 1;
                }
            }
            if unique < options.minimal_kmer_count {
                return Err(BasepairError::Invariant(format!(
                    "got only {unique} unique kmers of required {} for sequence {}",
                    options.minimal_kmer_count, identifiers[index]
                )));
            }
            kmer_counts.push(unique);
        }

        Ok(Self {
            identifiers,
            kmers,
            kmer_counts,
            options,
        })
    }

    pub fn options(&self) -> &MegamashOptions {
        &self.options
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Number of unique k-mers kept for `identifier`.
    pub fn kmer_count(&self, identifier: &str) -> Option<usize> {
        self.identifiers
            .iter()
            .position(|id| id == identifier)
            .map(|index| self.kmer_counts[index])
    }

    /// Score `sequence` against every template.
    ///
    /// Every occurrence of a template's unique k-mer in the read counts, so a
    /// read repeating a region can score above 1. Returns the templates
    /// scoring above the threshold, best first.
    pub fn match_sequence(&self, sequence: &str) -> Vec<Match> {
        let sequence = sequence.to_ascii_uppercase();
        let mut hits = vec![0usize; self.identifiers.len()];
        if let Ok(kmers) = KmerIter::new(sequence.as_bytes(), self.options.kmer_size) {
            for kmer in kmers.canonical() {
                if let Some(&index) = self.kmers.get(&kmer) {
                    hits[index] += 1;
                }
            }
        }

        let mut matches: Vec<Match> = hits
            .iter()
            .zip(&self.kmer_counts)
            .zip(&self.identifiers)
            .filter_map(|((&hit, &total), identifier)| {
                let score = if total == 0 { 0.0 } else { hit as f64 / total as f64 };
                (score > self.options.threshold).then(|| Match {
                    identifier: identifier.clone(),
                    score,
                })
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches
    }

    /// Score many reads, in parallel when the `parallel` feature is on.
    pub fn match_all<S: AsRef<str> + Sync>(&self, sequences: &[S]) -> Vec<Vec<Match>> {
        #[cfg(feature = "parallel")]
        let result = {
            use rayon::prelude::*;
            sequences
                .par_iter()
                .map(|s| self.match_sequence(s.as_ref()))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let result = sequences
            .iter()
            .map(|s| self.match_sequence(s.as_ref()))
            .collect();

        result
    }
}

/// Serialize matches as a JSON array of `{"identifier", "score"}` objects.
pub fn matches_to_json(matches: &[Match]) -> Result<String> {
    serde_json::to_string(matches).map_err(|e| BasepairError::InvalidInput(format!("matches to JSON: {e}")))
}

/// Parse the output of [`matches_to_json`].
pub fn json_to_matches(json: &str) -> Result<Vec<Match>> {
    serde_json::from_str(json).map_err(|e| BasepairError::InvalidInput(format!("JSON to matches: {e}")))
}
