//! Tracing subscriber initialization.

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

static TEST_TRACING: Once = Once::new();

/// Returns the filter from `RUST_LOG`, falling back to INFO.
fn default_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
}

/// Initializes the global tracing subscriber for a binary.
///
/// Log verbosity defaults to INFO and can be overridden through `RUST_LOG`.
/// Panics if a global subscriber is already installed, which indicates a
/// double initialization bug in the caller.
pub fn init_tracing() {
    let subscriber = SubscriberBuilder::default()
        .with_env_filter(default_env_filter())
        .with_target(false)
        .finish();

    ::tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");
}

/// Initializes tracing for tests.
///
/// Safe to call from every test; only the first call installs the
/// subscriber. Output is captured per test by the libtest harness.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let subscriber = SubscriberBuilder::default()
            .with_env_filter(default_env_filter())
            .with_target(false)
            .with_test_writer()
            .finish();

        let _ = ::tracing::subscriber::set_global_default(subscriber);
    });
}
