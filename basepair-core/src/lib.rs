//! Shared primitives, traits, and utilities for the basepair toolkit.
//!
//! `basepair-core` provides the foundation that the other basepair crates build on:
//!
//! - **Error types**: [`BasepairError`] and [`Result`] for structured error handling
//! - **Traits**: [`RecordParser`] for streaming record iteration, [`WriteTo`] for
//!   record serialization
//! - **Hashing**: SHA-256 digests used by Seqhash and content addressing
//! - **Compression**: zstd and gzip streams with algorithm auto-detection
//! - **Radix**: arbitrary-length base58 and base94 codecs

pub mod compress;
pub mod error;
pub mod hash;
pub mod radix;
pub mod traits;

pub use error::{BasepairError, Result};
pub use traits::*;
