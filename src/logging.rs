//! Tracing setup for binaries and tests embedding the engine.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a compact stdout subscriber. `RUST_LOG` overrides
/// `default_level`.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Test flavour: route output through the test writer and tolerate
/// repeated installs across test cases.
#[cfg(test)]
pub(crate) fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
