//! Test utilities for stacksynth
//!
//! Helpers shared by unit tests and the integration suite: one-time logging
//! setup and shorthand for building flag overrides.
//!
//! ```rust,no_run
//! use stacksynth::test_utils::{flag_overrides, init_test_logging};
//!
//! init_test_logging(None);
//! let overrides = flag_overrides(&[("env", "prod")]);
//! assert_eq!(overrides.len(), 1);
//! ```

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::variables::{Overrides, ValueSource};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without a subscriber.
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=stacksynth=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Overrides as if each pair had been passed with `--var name=value`.
#[must_use]
pub fn flag_overrides(pairs: &[(&str, &str)]) -> Overrides {
    let mut overrides = Overrides::new();
    for (name, value) in pairs {
        overrides.insert_text(*name, *value, ValueSource::Flag);
    }
    overrides
}
