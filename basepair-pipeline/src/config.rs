//! Pipeline tunables.

use std::num::NonZeroUsize;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Default capacity of every inter-stage channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Channel sizing and worker count for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    pub channel_capacity: usize,
    /// Parallel copies of a stage run by [`run_workers`](crate::run_workers).
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            workers: thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

impl PipelineConfig {
    /// A bounded channel of the configured capacity.
    pub fn channel<T>(&self) -> (Sender<T>, Receiver<T>) {
        bounded(self.channel_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.channel_capacity, 1024);
        assert!(config.workers >= 1);
        let (tx, rx) = config.channel::<u8>();
        assert_eq!(tx.capacity(), Some(1024));
        drop(rx);
    }
}
