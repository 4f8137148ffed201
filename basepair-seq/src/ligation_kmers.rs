//! Ligation junction k-mers.
//!
//! After sequencing a Golden Gate or ligation reaction, each read can be
//! checked for the k-mers that span a ligation junction. Reads carrying a
//! junction k-mer (on either strand) are direct evidence that the two
//! flanking fragments were joined.

use basepair_core::{BasepairError, Result};

use crate::restriction::Fragment;
use crate::transform::{reverse_complement, standardize_dna};

/// A canonical k-mer spanning the junction between two fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KmerOverlap {
    pub kmer: String,
    pub fragment1: Fragment,
    pub fragment2: Fragment,
}

/// Compute the junction k-mers of a circular ligation product.
///
/// `product` and `pattern` are the outputs of
/// [`ligate`](crate::restriction::ligate). Each junction contributes the
/// 4 bp overhang plus `(kmer_size - 4) / 2` bases on either side; the
/// junction after the last fragment wraps back to `fragments[0]`.
///
/// # Errors
///
/// Fails with fewer than two fragments, a k-mer shorter than 12, or a
/// pattern that walks past the doubled product.
pub fn find_kmer_overlaps(
    fragments: &[Fragment],
    product: &str,
    pattern: &[usize],
    kmer_size: usize,
) -> Result<Vec<KmerOverlap>> {
    if fragments.len() < 2 {
        return Err(BasepairError::InvalidInput(
            "need at least two fragments to find overlaps".into(),
        ));
    }
    let flank = kmer_size.saturating_sub(4) / 2;
    if flank < 4 {
        return Err(BasepairError::InvalidInput("need at least a kmer of 12".into()));
    }

    let ligation = product.repeat(2);
    let fragment_at = |index: usize| {
        fragments.get(index).ok_or_else(|| {
            BasepairError::InvalidInput(format!("ligation pattern references missing fragment {index}"))
        })
    };

    let mut position = 0usize;
    let mut overlaps = Vec::with_capacity(pattern.len());
    for (i, &index) in pattern.iter().enumerate() {
        let fragment1 = fragment_at(index)?;
        let fragment2 = match pattern.get(i + 1) {
            Some(&next) => fragment_at(next)?,
            None => &fragments[0],
        };
        position += fragment1.forward_overhang.len() + fragment1.sequence.len();
        let window = position
            .checked_sub(flank)
            .and_then(|start| ligation.get(start..position + 4 + flank))
            .ok_or_else(|| {
                BasepairError::InvalidInput(format!("junction at {position} falls outside the ligation product"))
            })?;
        overlaps.push(KmerOverlap {
            kmer: standardize_dna(&window.to_ascii_uppercase()),
            fragment1: fragment1.clone(),
            fragment2: fragment2.clone(),
        });
    }
    Ok(overlaps)
}

/// Return the overlaps whose k-mer occurs in `read`, on either strand.
pub fn find_kmers(overlaps: &[KmerOverlap], read: &str) -> Vec<KmerOverlap> {
    let read = read.to_ascii_uppercase();
    overlaps
        .iter()
        .filter(|overlap| {
            let kmer = overlap.kmer.to_ascii_uppercase();
            read.contains(&kmer) || read.contains(&reverse_complement(&kmer))
        })
        .cloned()
        .collect()
}
