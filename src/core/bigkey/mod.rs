//! Big key detection module.
//!
//! Walks the keyspace with `SCAN` and flags keys whose size meets their
//! type's threshold.

mod scanner;
mod thresholds;

pub use scanner::{BigKeyScan, BigKeyScanner, BigKeyScannerBuilder};
pub use thresholds::{
    ThresholdTable, ThresholdTableBuilder, DEFAULT_CONTAINER_THRESHOLD, DEFAULT_STRING_THRESHOLD,
};

use crate::core::keyspace::{KeyspaceStore, KeyType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A key whose size met its type's threshold
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    /// Key name
    pub key: String,
    /// Type reported by the store
    pub key_type: KeyType,
    /// Byte length for strings, element count for everything else
    pub size: u64,
    /// Threshold that was met
    pub threshold: u64,
}

impl Finding {
    /// How many times over its threshold this key is
    pub fn ratio(&self) -> f64 {
        self.size as f64 / self.threshold as f64
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "big key: {}, type: {}, size: {}",
            self.key, self.key_type, self.size
        )
    }
}

/// Counters kept while a scan runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Batches fetched from the store
    pub batches: u64,
    /// Batches that came back empty
    pub empty_batches: u64,
    /// Keys whose type was looked up
    pub keys_scanned: u64,
    /// Keys that vanished or failed a lookup
    pub keys_skipped: u64,
    /// Keys of a type without a size metric
    pub keys_unrecognized: u64,
    /// Keys that met their threshold
    pub findings: u64,
}

/// Scan a store with the given thresholds and default scan options
///
/// Shorthand for `BigKeyScanner::new(thresholds.clone()).scan(store)`.
pub fn scan<S: KeyspaceStore>(store: S, thresholds: &ThresholdTable) -> BigKeyScan<S> {
    BigKeyScanner::new(thresholds.clone()).scan(store)
}
