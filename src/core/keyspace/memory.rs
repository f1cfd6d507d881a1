//! In-memory keyspace backend for testing.
//!
//! Emulates `SCAN` over an insertion-ordered keyspace. Deleted keys leave a
//! tombstone so cursors stay stable while the keyspace shrinks, which mirrors
//! the guarantee Redis gives for keys that exist for the whole iteration.

use super::{KeyType, KeyspaceStore, ScanBatch, ScanCursor, ScanOptions};
use crate::error::StoreError;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A value held by [`InMemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    String(String),
    Hash(BTreeMap<String, String>),
    List(Vec<String>),
    Set(BTreeSet<String>),
    ZSet(BTreeMap<String, f64>),
    /// A value of a type without a size metric, e.g. `stream`
    Other { tag: String, len: u64 },
}

impl StoredValue {
    /// A string of `len` bytes
    pub fn string_of_len(len: usize) -> Self {
        StoredValue::String("x".repeat(len))
    }

    /// A hash with `fields` distinct fields
    pub fn hash_with_fields(fields: usize) -> Self {
        StoredValue::Hash(
            (1..=fields)
                .map(|i| (format!("field_{}", i), format!("value_{}", i)))
                .collect(),
        )
    }

    /// A list with `len` elements
    pub fn list_of_len(len: usize) -> Self {
        StoredValue::List((1..=len).map(|i| format!("item_{}", i)).collect())
    }

    /// A set with `len` members
    pub fn set_of_len(len: usize) -> Self {
        StoredValue::Set((1..=len).map(|i| format!("member_{}", i)).collect())
    }

    /// A sorted set with `len` members
    pub fn zset_of_len(len: usize) -> Self {
        StoredValue::ZSet(
            (1..=len)
                .map(|i| (format!("member_{}", i), i as f64))
                .collect(),
        )
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            StoredValue::String(_) => KeyType::String,
            StoredValue::Hash(_) => KeyType::Hash,
            StoredValue::List(_) => KeyType::List,
            StoredValue::Set(_) => KeyType::Set,
            StoredValue::ZSet(_) => KeyType::ZSet,
            StoredValue::Other { tag, .. } => KeyType::from_tag(tag),
        }
    }

    fn len(&self) -> u64 {
        match self {
            StoredValue::String(value) => value.len() as u64,
            StoredValue::Hash(fields) => fields.len() as u64,
            StoredValue::List(items) => items.len() as u64,
            StoredValue::Set(members) => members.len() as u64,
            StoredValue::ZSet(members) => members.len() as u64,
            StoredValue::Other { len, .. } => *len,
        }
    }
}

struct Slot {
    name: String,
    value: Option<StoredValue>,
}

/// Deterministic in-memory keyspace
///
/// Useful for testing the scanner without a running server. Supports
/// `MATCH` globs, a `COUNT` page size and a few injected faults.
#[derive(Default)]
pub struct InMemoryStore {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    vanish_on_type: HashSet<String>,
    failing_sizes: HashSet<String>,
    lose_connection_at_call: Option<usize>,
    iterate_calls: usize,
    type_calls: usize,
    size_calls: usize,
}

impl InMemoryStore {
    /// Create an empty keyspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a key
    pub fn insert(&mut self, key: impl Into<String>, value: StoredValue) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&slot) => self.slots[slot].value = Some(value),
            None => {
                self.index.insert(key.clone(), self.slots.len());
                self.slots.push(Slot {
                    name: key,
                    value: Some(value),
                });
            }
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: StoredValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Delete a key, returning whether it existed
    pub fn remove(&mut self, key: &str) -> bool {
        self.index
            .get(key)
            .and_then(|&slot| self.slots[slot].value.take())
            .is_some()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete `key` the moment its type is first queried
    ///
    /// Simulates a key that expires between `SCAN` and `TYPE`.
    pub fn vanish_on_type_lookup(&mut self, key: impl Into<String>) {
        self.vanish_on_type.insert(key.into());
    }

    /// Make the size query for `key` fail with a command error
    pub fn fail_size_lookup(&mut self, key: impl Into<String>) {
        self.failing_sizes.insert(key.into());
    }

    /// Fail the `n`th `iterate` call (1-based) and every call after it with a
    /// connection error
    pub fn lose_connection_at_iterate(&mut self, n: usize) {
        self.lose_connection_at_call = Some(n);
    }

    /// Number of `iterate` calls served so far
    pub fn iterate_calls(&self) -> usize {
        self.iterate_calls
    }

    /// Number of `type_of` calls served so far
    pub fn type_calls(&self) -> usize {
        self.type_calls
    }

    /// Number of `size_of` calls served so far
    pub fn size_calls(&self) -> usize {
        self.size_calls
    }

    fn get(&self, key: &str) -> Option<&StoredValue> {
        self.index
            .get(key)
            .and_then(|&slot| self.slots[slot].value.as_ref())
    }
}

impl KeyspaceStore for InMemoryStore {
    fn iterate(
        &mut self,
        cursor: ScanCursor,
        options: &ScanOptions,
    ) -> Result<ScanBatch, StoreError> {
        self.iterate_calls += 1;
        if let Some(n) = self.lose_connection_at_call {
            if self.iterate_calls >= n {
                return Err(StoreError::Connection(
                    "connection reset by peer".to_string(),
                ));
            }
        }

        let matcher = glob_to_regex(&options.pattern).map_err(|e| StoreError::Command {
            command: "SCAN",
            key: options.pattern.clone(),
            reason: e.to_string(),
        })?;

        let start = cursor.position() as usize;
        let end = (start + options.count.max(1)).min(self.slots.len());

        let keys = self
            .slots
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .filter(|slot| slot.value.is_some() && matcher.is_match(&slot.name))
            .map(|slot| slot.name.clone())
            .collect();

        let next = if end >= self.slots.len() {
            ScanCursor::START
        } else {
            ScanCursor::new(end as u64)
        };

        Ok(ScanBatch {
            cursor: next,
            keys,
            ..ScanBatch::default()
        })
    }

    fn type_of(&mut self, key: &str) -> Result<KeyType, StoreError> {
        self.type_calls += 1;
        if self.vanish_on_type.remove(key) {
            self.remove(key);
        }

        Ok(self
            .get(key)
            .map(StoredValue::key_type)
            .unwrap_or(KeyType::None))
    }

    fn size_of(&mut self, key: &str, key_type: &KeyType) -> Result<u64, StoreError> {
        self.size_calls += 1;
        let Some(command) = key_type.size_command() else {
            return Err(StoreError::Unmeasurable {
                key: key.to_string(),
                key_type: key_type.to_string(),
            });
        };

        if self.failing_sizes.contains(key) {
            return Err(StoreError::Command {
                command,
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        match self.get(key) {
            // Missing keys measure as zero, as in Redis
            None => Ok(0),
            Some(value) if value.key_type() == *key_type => Ok(value.len()),
            Some(_) => Err(StoreError::Command {
                command,
                key: key.to_string(),
                reason: "WRONGTYPE Operation against a key holding the wrong kind of value"
                    .to_string(),
            }),
        }
    }
}

/// Translate a Redis glob (`*`, `?`, `[...]`, `\x`) into an anchored regex
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                let mut first = true;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    if (inner == '^' && !first) || inner == '\\' || inner == '[' {
                        out.push('\\');
                    }
                    out.push(inner);
                    first = false;
                }
                out.push(']');
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    Regex::new(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(store: &mut InMemoryStore, options: &ScanOptions) -> (Vec<String>, usize) {
        let mut cursor = ScanCursor::START;
        let mut keys = Vec::new();
        let mut pages = 0;
        loop {
            let batch = store.iterate(cursor, options).unwrap();
            pages += 1;
            keys.extend(batch.keys);
            cursor = batch.cursor;
            if cursor.is_start() {
                break;
            }
        }
        (keys, pages)
    }

    #[test]
    fn empty_store_finishes_in_one_page() {
        let mut store = InMemoryStore::new();
        let batch = store
            .iterate(ScanCursor::START, &ScanOptions::default())
            .unwrap();

        assert!(batch.is_final());
        assert!(batch.keys.is_empty());
    }

    #[test]
    fn pages_follow_count_hint() {
        let mut store = InMemoryStore::new();
        for i in 0..10 {
            store.insert(format!("key_{}", i), StoredValue::string_of_len(1));
        }

        let options = ScanOptions {
            count: 3,
            ..ScanOptions::default()
        };
        let (keys, pages) = drain(&mut store, &options);

        assert_eq!(keys.len(), 10);
        assert_eq!(pages, 4);
    }

    #[test]
    fn match_pattern_leaves_empty_pages() {
        let mut store = InMemoryStore::new()
            .with("a", StoredValue::string_of_len(1))
            .with("b", StoredValue::string_of_len(1))
            .with("big:1", StoredValue::string_of_len(1));

        let options = ScanOptions {
            pattern: "big:*".to_string(),
            count: 2,
        };
        let first = store.iterate(ScanCursor::START, &options).unwrap();
        assert!(first.keys.is_empty());
        assert!(!first.is_final());

        let (keys, _) = drain(&mut store, &options);
        assert_eq!(keys, vec!["big:1".to_string()]);
    }

    #[test]
    fn removed_keys_do_not_shift_cursor() {
        let mut store = InMemoryStore::new();
        for i in 0..6 {
            store.insert(format!("key_{}", i), StoredValue::string_of_len(1));
        }
        let options = ScanOptions {
            count: 2,
            ..ScanOptions::default()
        };

        let first = store.iterate(ScanCursor::START, &options).unwrap();
        assert!(store.remove("key_0"));
        let second = store.iterate(first.cursor, &options).unwrap();

        assert_eq!(second.keys, vec!["key_2".to_string(), "key_3".to_string()]);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn sizes_follow_type_metric() {
        let mut store = InMemoryStore::new()
            .with("s", StoredValue::String("héllo".to_string()))
            .with("h", StoredValue::hash_with_fields(3))
            .with("l", StoredValue::list_of_len(4))
            .with("z", StoredValue::zset_of_len(5));

        assert_eq!(store.size_of("s", &KeyType::String).unwrap(), 6);
        assert_eq!(store.size_of("h", &KeyType::Hash).unwrap(), 3);
        assert_eq!(store.size_of("l", &KeyType::List).unwrap(), 4);
        assert_eq!(store.size_of("z", &KeyType::ZSet).unwrap(), 5);
        assert_eq!(store.size_of("missing", &KeyType::Set).unwrap(), 0);
    }

    #[test]
    fn wrong_type_size_is_command_error() {
        let mut store = InMemoryStore::new().with("h", StoredValue::hash_with_fields(3));

        let error = store.size_of("h", &KeyType::List).unwrap_err();
        assert!(!error.is_fatal());
        assert!(error.to_string().contains("WRONGTYPE"));
    }

    #[test]
    fn other_types_are_unmeasurable() {
        let mut store = InMemoryStore::new().with(
            "events",
            StoredValue::Other {
                tag: "stream".to_string(),
                len: 10_000,
            },
        );

        let key_type = store.type_of("events").unwrap();
        assert_eq!(key_type, KeyType::Other("stream".to_string()));
        assert!(matches!(
            store.size_of("events", &key_type),
            Err(StoreError::Unmeasurable { .. })
        ));
    }

    #[test]
    fn vanishing_key_reports_none() {
        let mut store = InMemoryStore::new().with("temp", StoredValue::string_of_len(10));
        store.vanish_on_type_lookup("temp");

        assert_eq!(store.type_of("temp").unwrap(), KeyType::None);
        assert!(store.is_empty());
    }

    #[test]
    fn lost_connection_is_fatal() {
        let mut store = InMemoryStore::new().with("a", StoredValue::string_of_len(1));
        store.lose_connection_at_iterate(1);

        let error = store
            .iterate(ScanCursor::START, &ScanOptions::default())
            .unwrap_err();
        assert!(error.is_fatal());
    }

    #[test]
    fn glob_translation() {
        assert!(glob_to_regex("user:*").unwrap().is_match("user:1"));
        assert!(!glob_to_regex("user:*").unwrap().is_match("session:1"));
        assert!(glob_to_regex("h?llo").unwrap().is_match("hallo"));
        assert!(glob_to_regex("h[ae]llo").unwrap().is_match("hello"));
        assert!(!glob_to_regex("h[ae]llo").unwrap().is_match("hillo"));
        assert!(glob_to_regex("h[^e]llo").unwrap().is_match("hallo"));
        assert!(!glob_to_regex("h[^e]llo").unwrap().is_match("hello"));
        assert!(glob_to_regex("a.b").unwrap().is_match("a.b"));
        assert!(!glob_to_regex("a.b").unwrap().is_match("axb"));
        assert!(glob_to_regex("star\\*").unwrap().is_match("star*"));
    }
}
