//! # Reporter Module
//!
//! Turns the lazy finding stream into a report that can be printed or
//! exported.

mod export;

pub use export::{export, export_csv, export_json, ExportFormat};

use crate::core::bigkey::{BigKeyScan, Finding, ScanStats};
use crate::core::keyspace::KeyspaceStore;
use crate::error::ScanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Result of a completed big key scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique id for this run
    pub id: Uuid,
    /// When the scan started
    pub started_at: DateTime<Utc>,
    /// Big keys, largest first
    pub findings: Vec<Finding>,
    /// Number of findings per type tag
    pub findings_by_type: BTreeMap<String, u64>,
    /// Thresholds in effect, by type tag
    pub thresholds: BTreeMap<String, u64>,
    pub stats: ScanStats,
    /// Time taken for the scan in milliseconds
    pub duration_ms: u64,
}

impl ScanReport {
    /// Drain a scan into a report
    ///
    /// Fails if the scan aborts; findings seen before the failure are lost
    /// with it.
    pub fn collect<S: KeyspaceStore>(mut scan: BigKeyScan<S>) -> Result<Self, ScanError> {
        let started_at = scan.started_at();
        let mut findings = Vec::new();
        for finding in scan.by_ref() {
            findings.push(finding?);
        }

        let mut findings_by_type = BTreeMap::new();
        for finding in &findings {
            *findings_by_type
                .entry(finding.key_type.to_string())
                .or_insert(0) += 1;
        }

        findings.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.key.cmp(&b.key)));

        let summary = scan.summary();
        Ok(Self {
            id: Uuid::new_v4(),
            started_at,
            findings,
            findings_by_type,
            thresholds: scan.thresholds().resolved(),
            stats: summary.stats,
            duration_ms: summary.duration_ms,
        })
    }

    /// Number of big keys found
    pub fn total_findings(&self) -> usize {
        self.findings.len()
    }

    /// The `n` largest findings
    pub fn largest(&self, n: usize) -> &[Finding] {
        &self.findings[..n.min(self.findings.len())]
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}
