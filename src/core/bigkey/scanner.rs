//! Incremental big key scanning.
//!
//! The scan is a lazy iterator: one `SCAN` page is fetched only after the
//! previous page has been fully classified, and dropping the iterator stops
//! all further store calls.

use super::{Finding, ScanStats, ThresholdTable};
use crate::core::keyspace::{
    KeyDescriptor, KeyType, KeyspaceStore, ScanCursor, ScanOptions,
};
use crate::error::{ConfigError, ScanError, StoreError};
use crate::events::{EventSender, ScanEvent, ScanProgress, ScanSummary};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Configured big key scanner
///
/// Holds the thresholds and `SCAN` options. One scanner can run any number of
/// scans, each with its own store handle and cursor.
#[derive(Debug, Clone, Default)]
pub struct BigKeyScanner {
    thresholds: ThresholdTable,
    options: ScanOptions,
}

impl BigKeyScanner {
    /// Create a scanner with default `SCAN` options
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self {
            thresholds,
            options: ScanOptions::default(),
        }
    }

    pub fn builder() -> BigKeyScannerBuilder {
        BigKeyScannerBuilder::default()
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Start a scan
    ///
    /// Pass `&mut store` to keep using the store afterwards.
    pub fn scan<S: KeyspaceStore>(&self, store: S) -> BigKeyScan<S> {
        BigKeyScan::new(store, self.thresholds.clone(), self.options.clone(), None)
    }

    /// Start a scan that reports progress through `events`
    pub fn scan_with_events<S: KeyspaceStore>(
        &self,
        store: S,
        events: EventSender,
    ) -> BigKeyScan<S> {
        BigKeyScan::new(
            store,
            self.thresholds.clone(),
            self.options.clone(),
            Some(events),
        )
    }
}

/// Builder for [`BigKeyScanner`]
#[derive(Debug, Default)]
pub struct BigKeyScannerBuilder {
    thresholds: Option<ThresholdTable>,
    pattern: Option<String>,
    count: Option<usize>,
}

impl BigKeyScannerBuilder {
    pub fn thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Only visit keys matching a glob (`MATCH`)
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Work hint for each `SCAN` call (`COUNT`)
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn build(self) -> Result<BigKeyScanner, ConfigError> {
        let mut options = ScanOptions::default();
        if let Some(pattern) = self.pattern {
            options.pattern = pattern;
        }
        if let Some(count) = self.count {
            if count == 0 {
                return Err(ConfigError::ZeroCount);
            }
            options.count = count;
        }

        Ok(BigKeyScanner {
            thresholds: self.thresholds.unwrap_or_default(),
            options,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// More pages to fetch
    Fetching,
    /// The final page has been fetched; draining its keys
    Draining,
    /// Completed or failed; yields nothing more
    Done,
}

/// A single pass over the keyspace, yielding big keys as they are found
///
/// The scan ends when the store hands back the start cursor. Empty pages
/// before that are normal (e.g. with a `MATCH` pattern) and do not end it.
///
/// Per-key problems are logged and skipped. A broken connection or a
/// rejected `SCAN` is yielded once as an error, after which the iterator
/// is exhausted.
pub struct BigKeyScan<S> {
    store: S,
    thresholds: ThresholdTable,
    options: ScanOptions,
    events: Option<EventSender>,
    cursor: ScanCursor,
    pending: VecDeque<String>,
    phase: Phase,
    stats: ScanStats,
    started_at: DateTime<Utc>,
    started: Instant,
    elapsed: Option<Duration>,
}

impl<S: KeyspaceStore> BigKeyScan<S> {
    fn new(
        store: S,
        thresholds: ThresholdTable,
        options: ScanOptions,
        events: Option<EventSender>,
    ) -> Self {
        debug!(pattern = %options.pattern, count = options.count, "Starting big key scan");
        if let Some(ref events) = events {
            events.scan(ScanEvent::Started {
                pattern: options.pattern.clone(),
                count: options.count,
            });
        }

        Self {
            store,
            thresholds,
            options,
            events,
            cursor: ScanCursor::START,
            pending: VecDeque::new(),
            phase: Phase::Fetching,
            stats: ScanStats::default(),
            started_at: Utc::now(),
            started: Instant::now(),
            elapsed: None,
        }
    }

    /// Thresholds this scan compares against
    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Wall-clock time the scan was started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Counters so far
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Whether the scan has completed or failed
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Time spent so far, frozen once the scan finishes
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    /// Summary of the scan so far
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            stats: self.stats,
            duration_ms: self.elapsed().as_millis() as u64,
        }
    }

    /// Give the store handle back, ending the scan
    pub fn into_store(self) -> S {
        self.store
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(ref events) = self.events {
            events.scan(event);
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        self.elapsed = Some(self.started.elapsed());
    }

    fn fail(&mut self, error: ScanError) -> Option<Result<Finding, ScanError>> {
        self.finish();
        warn!(error = %error, "Big key scan aborted");
        self.emit(ScanEvent::Failed {
            message: error.to_string(),
        });
        Some(Err(error))
    }

    fn skip(&mut self, key: &str, reason: String) {
        self.stats.keys_skipped += 1;
        warn!(key = %key, reason = %reason, "Skipping key");
        self.emit(ScanEvent::KeySkipped {
            key: key.to_string(),
            reason,
        });
    }

    fn fetch(&mut self) -> Result<(), ScanError> {
        let batch = self
            .store
            .iterate(self.cursor, &self.options)
            .map_err(|source| {
                if source.is_fatal() {
                    ScanError::Connectivity {
                        keys_scanned: self.stats.keys_scanned,
                        source,
                    }
                } else {
                    ScanError::Iteration {
                        cursor: self.cursor.position(),
                        source,
                    }
                }
            })?;

        self.stats.batches += 1;
        if batch.is_empty() {
            self.stats.empty_batches += 1;
        }
        if batch.is_final() {
            self.phase = Phase::Draining;
        }

        debug!(
            cursor = %batch.cursor,
            keys = batch.len(),
            batches = self.stats.batches,
            "Fetched SCAN batch"
        );
        self.emit(ScanEvent::BatchFetched(ScanProgress {
            batches: self.stats.batches,
            keys_scanned: self.stats.keys_scanned,
            batch_len: batch.len(),
            findings: self.stats.findings,
            cursor: batch.cursor.position(),
        }));

        for name in &batch.undecodable {
            self.stats.keys_scanned += 1;
            self.skip(
                &String::from_utf8_lossy(name),
                "key name is not valid UTF-8".to_string(),
            );
        }

        self.cursor = batch.cursor;
        self.pending.extend(batch.keys);
        Ok(())
    }

    /// Classify and measure one key
    ///
    /// `Ok(None)` means the key is not big, was skipped, or has no metric.
    /// `Err` is returned only for connection failures.
    fn inspect(&mut self, key: String) -> Result<Option<Finding>, StoreError> {
        self.stats.keys_scanned += 1;

        let key_type = match self.store.type_of(&key) {
            Ok(key_type) => key_type,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.skip(&key, e.to_string());
                return Ok(None);
            }
        };

        match key_type {
            KeyType::None => {
                self.skip(&key, "key no longer exists".to_string());
                return Ok(None);
            }
            KeyType::Other(ref tag) => {
                self.stats.keys_unrecognized += 1;
                trace!(key = %key, key_type = %tag, "No size metric for type");
                return Ok(None);
            }
            KeyType::String | KeyType::Hash | KeyType::List | KeyType::Set | KeyType::ZSet => {}
        }

        let descriptor = KeyDescriptor {
            name: key,
            key_type,
        };
        let Some(threshold) = self.thresholds.get(&descriptor.key_type) else {
            return Ok(None);
        };

        let size = match self.store.size_of(&descriptor.name, &descriptor.key_type) {
            Ok(size) => size,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.skip(&descriptor.name, e.to_string());
                return Ok(None);
            }
        };

        if size < threshold {
            return Ok(None);
        }

        Ok(Some(Finding {
            key: descriptor.name,
            key_type: descriptor.key_type,
            size,
            threshold,
        }))
    }
}

impl<S: KeyspaceStore> Iterator for BigKeyScan<S> {
    type Item = Result<Finding, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.phase == Phase::Done {
                return None;
            }

            if let Some(key) = self.pending.pop_front() {
                match self.inspect(key) {
                    Ok(Some(finding)) => {
                        self.stats.findings += 1;
                        info!(
                            key = %finding.key,
                            key_type = %finding.key_type,
                            size = finding.size,
                            "Found big key"
                        );
                        self.emit(ScanEvent::BigKeyFound(finding.clone()));
                        return Some(Ok(finding));
                    }
                    Ok(None) => continue,
                    Err(source) => {
                        let error = ScanError::Connectivity {
                            keys_scanned: self.stats.keys_scanned,
                            source,
                        };
                        return self.fail(error);
                    }
                }
            }

            if self.phase == Phase::Draining {
                self.finish();
                let summary = self.summary();
                info!(
                    findings = summary.stats.findings,
                    keys = summary.stats.keys_scanned,
                    batches = summary.stats.batches,
                    skipped = summary.stats.keys_skipped,
                    duration_ms = summary.duration_ms,
                    "Big key scan complete"
                );
                self.emit(ScanEvent::Completed(summary));
                return None;
            }

            if let Err(error) = self.fetch() {
                return self.fail(error);
            }
        }
    }
}

impl<S: KeyspaceStore> std::iter::FusedIterator for BigKeyScan<S> {}
