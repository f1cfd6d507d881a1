//! # Error Module
//!
//! Error types for the big key scanner.
//!
//! ## Design Principles
//! - **Never panic** on store data - return errors instead
//! - **Include context** - key names, commands, what went wrong
//! - **Separate fatal from per-key** - a broken connection aborts a scan,
//!   a single vanished key does not

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum BigKeyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Errors raised while building scanner configuration.
///
/// These are always reported before the first store call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No threshold configured for type '{key_type}' and no default threshold set")]
    MissingThreshold { key_type: String },

    #[error("Threshold for type '{key_type}' must be at least 1")]
    ZeroThreshold { key_type: String },

    #[error("Unknown key type '{name}' in threshold table")]
    UnknownType { name: String },

    #[error("Failed to read thresholds file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid thresholds file {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    #[error("Invalid connection settings: {0}")]
    Connection(String),

    #[error("SCAN count hint must be at least 1")]
    ZeroCount,
}

/// Errors returned by a keyspace store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is unreachable or the connection broke. Fatal for a scan.
    #[error("Connection to store failed: {0}")]
    Connection(String),

    /// A single command failed (wrong type, key changed, server error).
    #[error("Command {command} failed for key '{key}': {reason}")]
    Command {
        command: &'static str,
        key: String,
        reason: String,
    },

    /// The type has no size metric.
    #[error("Key '{key}' has type '{key_type}' which has no size metric")]
    Unmeasurable { key: String, key_type: String },
}

impl StoreError {
    /// Whether this error means the store handle itself is unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Errors that end a big key scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Lost connection to the store after {keys_scanned} keys: {source}")]
    Connectivity {
        keys_scanned: u64,
        #[source]
        source: StoreError,
    },

    #[error("Store rejected SCAN at cursor {cursor}: {source}")]
    Iteration {
        cursor: u64,
        #[source]
        source: StoreError,
    },
}

/// Errors that occur while exporting a scan report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, BigKeyError>;
