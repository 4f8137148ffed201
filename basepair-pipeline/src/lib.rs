//! Concurrent record pipelines for the basepair toolkit.
//!
//! Stages run on their own threads and pass records over bounded
//! `crossbeam_channel`s. A shared [`Context`] carries cancellation: the first
//! failing stage cancels its group and every other stage stops at its next
//! send or receive.
//!
//! - **Kernel**: [`parse_to_channel`], [`many_to_channel`], [`filter`],
//!   [`map`] and [`run_workers`]
//! - **Groups**: [`TaskGroup`] for first-error aggregation
//! - **Presets**: Megamash and dual-barcode annotation of FASTQ reads and a
//!   compressed FASTQ sink ([`presets`])
//! - **External programs**: [`external::run_pipeline`] chains child processes
//!
//! # Example
//!
//! ```
//! use std::thread;
//!
//! use basepair_io::FastqParser;
//! use basepair_pipeline::{filter, parse_to_channel, Context, PipelineConfig};
//!
//! let fastq = "@r1\nACGT\n+\nIIII\n@r2\nA\n+\nI\n";
//! let ctx = Context::new();
//! let config = PipelineConfig::default();
//! let (raw_tx, raw_rx) = config.channel();
//! let (long_tx, long_rx) = config.channel();
//!
//! thread::scope(|scope| {
//!     scope.spawn(|| parse_to_channel(&ctx, &mut FastqParser::new(fastq.as_bytes()), raw_tx));
//!     scope.spawn(|| filter(&ctx, &raw_rx, long_tx, |read| read.sequence.len() > 1));
//! });
//! let kept: Vec<_> = long_rx.iter().map(|read| read.identifier).collect();
//! assert_eq!(kept, vec!["r1"]);
//! ```

pub mod config;
pub mod context;
pub mod external;
pub mod group;
pub mod kernel;
pub mod logging;
pub mod presets;

pub use config::PipelineConfig;
pub use context::Context;
pub use group::TaskGroup;
pub use kernel::{filter, many_to_channel, map, parse_to_channel, recv, run_workers, send};
pub use presets::{dual_barcode_fastq, megamash_fastq, write_compressed_fastq, FastqMatchChannel};
