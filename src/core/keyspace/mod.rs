//! # Keyspace Module
//!
//! Access to the keyspace of a Redis-compatible store.
//!
//! ## Backends
//! - `RedisStore` - A live Redis connection
//! - `InMemoryStore` - For testing

mod memory;
mod server;
mod traits;

pub use memory::{InMemoryStore, StoredValue};
pub use server::{ConnectionSettings, RedisStore};
pub use traits::KeyspaceStore;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in an incremental keyspace iteration.
///
/// The store hands back a new cursor with every batch. A returned cursor
/// equal to [`ScanCursor::START`] means the iteration is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScanCursor(u64);

impl ScanCursor {
    /// Sentinel cursor that both starts and ends an iteration
    pub const START: ScanCursor = ScanCursor(0);

    pub fn new(position: u64) -> Self {
        Self(position)
    }

    pub fn is_start(&self) -> bool {
        self.0 == 0
    }

    pub fn position(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScanCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of a stored value as reported by `TYPE`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyType {
    String,
    Hash,
    List,
    Set,
    ZSet,
    /// The key does not exist (expired or deleted)
    None,
    /// Any type without a size metric (stream, module types)
    Other(String),
}

impl KeyType {
    /// Every type that has a size metric
    pub const MEASURABLE: [KeyType; 5] = [
        KeyType::String,
        KeyType::Hash,
        KeyType::List,
        KeyType::Set,
        KeyType::ZSet,
    ];

    /// Parse the textual tag returned by the store
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "string" => KeyType::String,
            "hash" => KeyType::Hash,
            "list" => KeyType::List,
            "set" => KeyType::Set,
            "zset" => KeyType::ZSet,
            "none" => KeyType::None,
            _ => KeyType::Other(tag.to_string()),
        }
    }

    /// The tag this type is reported as by the store
    pub fn tag(&self) -> &str {
        match self {
            KeyType::String => "string",
            KeyType::Hash => "hash",
            KeyType::List => "list",
            KeyType::Set => "set",
            KeyType::ZSet => "zset",
            KeyType::None => "none",
            KeyType::Other(tag) => tag,
        }
    }

    /// Whether a size metric exists for this type
    pub fn is_measurable(&self) -> bool {
        match self {
            KeyType::String | KeyType::Hash | KeyType::List | KeyType::Set | KeyType::ZSet => {
                true
            }
            KeyType::None | KeyType::Other(_) => false,
        }
    }

    /// Command used to measure a key of this type
    pub fn size_command(&self) -> Option<&'static str> {
        match self {
            KeyType::String => Some("STRLEN"),
            KeyType::Hash => Some("HLEN"),
            KeyType::List => Some("LLEN"),
            KeyType::Set => Some("SCARD"),
            KeyType::ZSet => Some("ZCARD"),
            KeyType::None | KeyType::Other(_) => None,
        }
    }
}

impl From<String> for KeyType {
    fn from(tag: String) -> Self {
        KeyType::from_tag(&tag)
    }
}

impl From<KeyType> for String {
    fn from(key_type: KeyType) -> Self {
        key_type.tag().to_string()
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A key name paired with its type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    pub name: String,
    pub key_type: KeyType,
}

/// One page of an incremental keyspace iteration
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    /// Cursor to pass to the next `iterate` call
    pub cursor: ScanCursor,
    /// Keys in this page; may be empty mid-scan
    pub keys: Vec<String>,
    /// Raw names in this page that are not valid UTF-8
    pub undecodable: Vec<Vec<u8>>,
}

impl ScanBatch {
    /// Number of names returned, decodable or not
    pub fn len(&self) -> usize {
        self.keys.len() + self.undecodable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the store reported the end of the iteration
    pub fn is_final(&self) -> bool {
        self.cursor.is_start()
    }
}

/// Options forwarded to every `SCAN` call
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Glob pattern passed as `MATCH`
    pub pattern: String,
    /// Work hint passed as `COUNT`
    pub count: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            count: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_type_from_tag() {
        assert_eq!(KeyType::from_tag("string"), KeyType::String);
        assert_eq!(KeyType::from_tag("hash"), KeyType::Hash);
        assert_eq!(KeyType::from_tag("zset"), KeyType::ZSet);
        assert_eq!(KeyType::from_tag("none"), KeyType::None);
    }

    #[test]
    fn key_type_tags_are_case_insensitive() {
        assert_eq!(KeyType::from_tag("LIST"), KeyType::List);
        assert_eq!(KeyType::from_tag("Set"), KeyType::Set);
    }

    #[test]
    fn unknown_tag_keeps_its_name() {
        let key_type = KeyType::from_tag("ReJSON-RL");
        assert_eq!(key_type, KeyType::Other("ReJSON-RL".to_string()));
        assert_eq!(key_type.tag(), "ReJSON-RL");
        assert!(!key_type.is_measurable());
        assert!(key_type.size_command().is_none());
    }

    #[test]
    fn stream_is_not_measurable() {
        assert!(!KeyType::from_tag("stream").is_measurable());
    }

    #[test]
    fn measurable_types_have_size_commands() {
        for key_type in KeyType::MEASURABLE {
            assert!(key_type.is_measurable());
            assert!(key_type.size_command().is_some());
        }
        assert!(KeyType::None.size_command().is_none());
    }

    #[test]
    fn key_type_serializes_as_tag() {
        let json = serde_json::to_string(&KeyType::ZSet).unwrap();
        assert_eq!(json, "\"zset\"");

        let parsed: KeyType = serde_json::from_str("\"stream\"").unwrap();
        assert_eq!(parsed, KeyType::Other("stream".to_string()));
    }

    #[test]
    fn start_cursor_is_sentinel() {
        assert!(ScanCursor::START.is_start());
        assert!(ScanCursor::default().is_start());
        assert!(!ScanCursor::new(17).is_start());
        assert_eq!(ScanCursor::new(17).to_string(), "17");
    }

    #[test]
    fn batch_with_start_cursor_is_final() {
        let batch = ScanBatch {
            cursor: ScanCursor::START,
            keys: vec!["a".to_string()],
            ..ScanBatch::default()
        };
        assert!(batch.is_final());

        let batch = ScanBatch {
            cursor: ScanCursor::new(5),
            ..ScanBatch::default()
        };
        assert!(!batch.is_final());
        assert!(batch.is_empty());
    }

    #[test]
    fn undecodable_names_count_towards_batch_len() {
        let batch = ScanBatch {
            cursor: ScanCursor::new(9),
            keys: vec!["a".to_string()],
            undecodable: vec![vec![0xff, 0xfe]],
        };
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }
}
