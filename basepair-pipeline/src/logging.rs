//! Logger setup for programs built on the pipeline.

use std::sync::Once;

use env_logger::Env;

static INIT: Once = Once::new();

/// Install `env_logger`, honouring `RUST_LOG` and falling back to
/// `default_filter` (e.g. `"info"` or `"basepair_pipeline=debug"`).
///
/// Safe to call more than once; only the first call has any effect. A
/// logger installed by someone else is left in place.
pub fn init(default_filter: &str) {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
            .format_timestamp_millis()
            .try_init();
    });
}
