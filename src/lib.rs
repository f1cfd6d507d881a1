//! # Redis Big Key Scanner
//!
//! Finds keys whose values have grown past a size threshold for their type.
//!
//! ## Core Philosophy
//! - **Never block the server** - walk the keyspace with `SCAN`, never `KEYS`
//! - **Read only** - the scanner never writes to the store
//! - **Keep going** - a key that vanishes mid-scan is skipped, not fatal
//!
//! ## Architecture
//! The library is split into a core engine (store-agnostic) and presentation layers:
//! - `core` - Keyspace access, thresholds, the scan itself and reporting
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{BigKeyError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Verbosity is read
/// from `RUST_LOG`, falling back to `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber may already be installed (e.g. by a test harness)
    let _ = tracing::subscriber::set_global_default(subscriber);
}
