//! K-mer iteration and strand-canonical k-mers.
//!
//! Wraps [`std::slice::Windows`] over an already-normalized sequence. A
//! canonical k-mer is the lexicographically smaller of the k-mer and its
//! reverse complement, which makes strand orientation irrelevant.

use basepair_core::{BasepairError, Result};

use crate::transform::complement_base;

/// Iterator over k-mer windows of a byte slice.
///
/// Yields `&[u8]` slices of length `k`. A sequence shorter than `k` yields
/// nothing.
pub struct KmerIter<'a> {
    inner: std::slice::Windows<'a, u8>,
    remaining: usize,
}

impl<'a> KmerIter<'a> {
    /// Create a new k-mer iterator.
    ///
    /// # Errors
    ///
    /// Returns [`BasepairError::InvalidInput`] when `k` is zero.
    pub fn new(seq: &'a [u8], k: usize) -> Result<Self> {
        if k == 0 {
            return Err(BasepairError::InvalidInput(
                "k-mer size must be at least 1".into(),
            ));
        }
        Ok(Self {
            inner: seq.windows(k),
            remaining: (seq.len() + 1).saturating_sub(k),
        })
    }

    /// Adapt into an iterator of canonical k-mers.
    pub fn canonical(self) -> CanonicalKmers<'a> {
        CanonicalKmers { inner: self }
    }
}

impl<'a> Iterator for KmerIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for KmerIter<'_> {}

/// Canonical form of a single k-mer.
pub fn canonical_kmer(kmer: &[u8]) -> Vec<u8> {
    let rc: Vec<u8> = kmer.iter().rev().map(|&b| complement_base(b)).collect();
    if rc.as_slice() < kmer {
        rc
    } else {
        kmer.to_vec()
    }
}

/// Iterator returned by [`KmerIter::canonical`].
pub struct CanonicalKmers<'a> {
    inner: KmerIter<'a>,
}

impl Iterator for CanonicalKmers<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(canonical_kmer)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_k2() {
        let seq = b"ACGT";
        let kmers: Vec<&[u8]> = KmerIter::new(seq, 2).unwrap().collect();
        assert_eq!(kmers, vec![b"AC", b"CG", b"GT"]);
    }

    #[test]
    fn exact_size() {
        let iter = KmerIter::new(b"ACGTACGT", 3).unwrap();
        assert_eq!(iter.len(), 6);
    }

    #[test]
    fn k_zero_error() {
        assert!(KmerIter::new(b"ACGT", 0).is_err());
    }

    #[test]
    fn k_longer_than_sequence_is_empty() {
        let mut iter = KmerIter::new(b"AC", 3).unwrap();
        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
    }

    #[test]
    fn canonical_picks_smaller_strand() {
        assert_eq!(canonical_kmer(b"TTTG"), b"CAAA".to_vec());
        assert_eq!(canonical_kmer(b"AAAC"), b"AAAC".to_vec());
        let kmers: Vec<Vec<u8>> = KmerIter::new(b"TTTT", 4).unwrap().canonical().collect();
        assert_eq!(kmers, vec![b"AAAA".to_vec()]);
    }
}
