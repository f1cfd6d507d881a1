//! Event type definitions for progress reporting.

use crate::core::bigkey::{Finding, ScanStats};
use serde::{Deserialize, Serialize};

/// All events emitted by the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Keyspace scan events
    Scan(ScanEvent),
}

/// Events during a big key scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { pattern: String, count: usize },
    /// A batch of keys was fetched from the store
    BatchFetched(ScanProgress),
    /// A key met its type's threshold
    BigKeyFound(Finding),
    /// A key was skipped but scanning continues
    KeySkipped { key: String, reason: String },
    /// Scanning completed
    Completed(ScanSummary),
    /// Scanning stopped on a fatal error
    Failed { message: String },
}

/// Progress information after each batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Batches fetched so far
    pub batches: u64,
    /// Keys inspected so far, not counting the batch just fetched
    pub keys_scanned: u64,
    /// Keys in the batch just fetched
    pub batch_len: usize,
    /// Big keys found so far
    pub findings: u64,
    /// Cursor returned with the batch
    pub cursor: u64,
}

/// Summary of a finished scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub stats: ScanStats,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
