//! Per-type size thresholds.

use crate::core::keyspace::KeyType;
use crate::error::ConfigError;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Strings at or above 5 KiB are flagged by default
pub const DEFAULT_STRING_THRESHOLD: u64 = 5 * 1024;

/// Containers with 500 or more elements are flagged by default
pub const DEFAULT_CONTAINER_THRESHOLD: u64 = 500;

/// Key of the fallback entry in a thresholds file
const DEFAULT_ENTRY: &str = "default";

/// Immutable mapping from key type to the size at which a key is flagged
///
/// Every measurable type resolves to a threshold, either its own entry or the
/// default. This is checked once in [`ThresholdTableBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdTable {
    entries: HashMap<KeyType, u64>,
    default: Option<u64>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(KeyType::String, DEFAULT_STRING_THRESHOLD);
        for key_type in [KeyType::Hash, KeyType::List, KeyType::Set, KeyType::ZSet] {
            entries.insert(key_type, DEFAULT_CONTAINER_THRESHOLD);
        }
        Self {
            entries,
            default: None,
        }
    }
}

impl ThresholdTable {
    pub fn builder() -> ThresholdTableBuilder {
        ThresholdTableBuilder::default()
    }

    /// Threshold for a type, or `None` if the type is never flagged
    pub fn get(&self, key_type: &KeyType) -> Option<u64> {
        if !key_type.is_measurable() {
            return None;
        }
        self.entries.get(key_type).copied().or(self.default)
    }

    /// Resolved thresholds for every measurable type, keyed by type tag
    pub fn resolved(&self) -> BTreeMap<String, u64> {
        KeyType::MEASURABLE
            .iter()
            .filter_map(|key_type| {
                self.get(key_type)
                    .map(|threshold| (key_type.to_string(), threshold))
            })
            .collect()
    }

    /// Load a table from a JSON file
    ///
    /// The file maps type tags to thresholds, with an optional `"default"`:
    ///
    /// ```json
    /// { "string": 10240, "hash": 1000, "default": 500 }
    /// ```
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&contents).map_err(|e| match e {
            ConfigError::InvalidFile { reason, .. } => ConfigError::InvalidFile {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a table from JSON text (see [`from_json_file`](Self::from_json_file))
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, u64> =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidFile {
                path: Default::default(),
                reason: e.to_string(),
            })?;

        let mut builder = Self::builder();
        for (name, threshold) in raw {
            if name == DEFAULT_ENTRY {
                builder = builder.default_threshold(threshold);
            } else {
                builder = builder.set(KeyType::from_tag(&name), threshold);
            }
        }
        builder.build()
    }
}

/// Builder for [`ThresholdTable`]
#[derive(Debug, Default, Clone)]
pub struct ThresholdTableBuilder {
    entries: Vec<(KeyType, u64)>,
    default: Option<u64>,
}

impl ThresholdTableBuilder {
    /// Set the threshold for one type
    pub fn set(mut self, key_type: KeyType, threshold: u64) -> Self {
        self.entries.push((key_type, threshold));
        self
    }

    /// Threshold for the string type
    pub fn string(self, threshold: u64) -> Self {
        self.set(KeyType::String, threshold)
    }

    /// Same threshold for hash, list, set and sorted set
    pub fn containers(self, threshold: u64) -> Self {
        self.set(KeyType::Hash, threshold)
            .set(KeyType::List, threshold)
            .set(KeyType::Set, threshold)
            .set(KeyType::ZSet, threshold)
    }

    /// Fallback for types without an entry
    pub fn default_threshold(mut self, threshold: u64) -> Self {
        self.default = Some(threshold);
        self
    }

    /// Validate and freeze the table
    pub fn build(self) -> Result<ThresholdTable, ConfigError> {
        if self.default == Some(0) {
            return Err(ConfigError::ZeroThreshold {
                key_type: DEFAULT_ENTRY.to_string(),
            });
        }

        let mut entries = HashMap::new();
        for (key_type, threshold) in self.entries {
            if !key_type.is_measurable() {
                return Err(ConfigError::UnknownType {
                    name: key_type.to_string(),
                });
            }
            if threshold == 0 {
                return Err(ConfigError::ZeroThreshold {
                    key_type: key_type.to_string(),
                });
            }
            // Later entries win
            entries.insert(key_type, threshold);
        }

        if self.default.is_none() {
            if let Some(missing) = KeyType::MEASURABLE
                .iter()
                .find(|key_type| !entries.contains_key(*key_type))
            {
                return Err(ConfigError::MissingThreshold {
                    key_type: missing.to_string(),
                });
            }
        }

        Ok(ThresholdTable {
            entries,
            default: self.default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_reference_values() {
        let table = ThresholdTable::default();
        assert_eq!(table.get(&KeyType::String), Some(5120));
        assert_eq!(table.get(&KeyType::Hash), Some(500));
        assert_eq!(table.get(&KeyType::List), Some(500));
        assert_eq!(table.get(&KeyType::Set), Some(500));
        assert_eq!(table.get(&KeyType::ZSet), Some(500));
    }

    #[test]
    fn unmeasurable_types_have_no_threshold() {
        let table = ThresholdTable::builder().default_threshold(1).build().unwrap();
        assert_eq!(table.get(&KeyType::None), None);
        assert_eq!(table.get(&KeyType::Other("stream".to_string())), None);
    }

    #[test]
    fn missing_entry_without_default_fails() {
        let error = ThresholdTable::builder()
            .string(5120)
            .set(KeyType::Hash, 500)
            .build()
            .unwrap_err();

        assert!(matches!(error, ConfigError::MissingThreshold { ref key_type } if key_type == "list"));
    }

    #[test]
    fn default_fills_missing_entries() {
        let table = ThresholdTable::builder()
            .string(1024)
            .default_threshold(200)
            .build()
            .unwrap();

        assert_eq!(table.get(&KeyType::String), Some(1024));
        assert_eq!(table.get(&KeyType::Set), Some(200));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let error = ThresholdTable::builder()
            .string(0)
            .containers(500)
            .build()
            .unwrap_err();
        assert!(matches!(error, ConfigError::ZeroThreshold { .. }));

        let error = ThresholdTable::builder().default_threshold(0).build().unwrap_err();
        assert!(matches!(error, ConfigError::ZeroThreshold { .. }));
    }

    #[test]
    fn later_entries_override_earlier_ones() {
        let table = ThresholdTable::builder()
            .string(5120)
            .containers(500)
            .set(KeyType::Hash, 1000)
            .build()
            .unwrap();

        assert_eq!(table.get(&KeyType::Hash), Some(1000));
        assert_eq!(table.get(&KeyType::List), Some(500));
    }

    #[test]
    fn parses_json_with_default() {
        let table = ThresholdTable::from_json_str(r#"{"string": 100, "default": 7}"#).unwrap();
        assert_eq!(table.get(&KeyType::String), Some(100));
        assert_eq!(table.get(&KeyType::ZSet), Some(7));
    }

    #[test]
    fn json_with_unknown_type_fails() {
        let error =
            ThresholdTable::from_json_str(r#"{"stream": 100, "default": 7}"#).unwrap_err();
        assert!(matches!(error, ConfigError::UnknownType { ref name } if name == "stream"));
    }

    #[test]
    fn malformed_json_fails() {
        let error = ThresholdTable::from_json_str(r#"{"string": -1}"#).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidFile { .. }));
    }

    #[test]
    fn resolved_lists_every_measurable_type() {
        let resolved = ThresholdTable::default().resolved();
        assert_eq!(resolved.len(), 5);
        assert_eq!(resolved["string"], 5120);
        assert_eq!(resolved["zset"], 500);
    }
}
