//! SHA-256 digests for content addressing.

use sha2::{Digest, Sha256};

/// Raw SHA-256 digest of `data`.
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// The first `N` bytes of the SHA-256 digest of `data`.
///
/// Content identifiers keep a truncated digest next to their own flag bytes.
/// `N` must not exceed 32.
pub fn sha256_prefix<const N: usize>(data: &[u8]) -> [u8; N] {
    let digest = sha256_digest(data);
    let mut prefix = [0u8; N];
    prefix.copy_from_slice(&digest[..N]);
    prefix
}
