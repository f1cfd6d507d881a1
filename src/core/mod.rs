//! # Core Module
//!
//! The store-agnostic big key engine.
//!
//! ## Modules
//! - `keyspace` - Incremental access to a store's keys, types and sizes
//! - `bigkey` - Threshold table and the lazy big key scan
//! - `reporter` - Collects findings into a report and exports it

pub mod bigkey;
pub mod keyspace;
pub mod reporter;

// Re-export commonly used types
pub use bigkey::{BigKeyScan, BigKeyScanner, Finding, ScanStats, ThresholdTable};
pub use keyspace::{KeyType, KeyspaceStore, ScanCursor};
pub use reporter::ScanReport;
