//! Keyspace store trait definition.

use super::{KeyType, ScanBatch, ScanCursor, ScanOptions};
use crate::error::StoreError;

/// Trait for keyspace backends
///
/// Implement this trait to scan something other than a live Redis server
/// (e.g., for testing). All methods are read-only.
pub trait KeyspaceStore {
    /// Fetch the next page of keys starting at `cursor`
    ///
    /// The returned batch carries the cursor for the following call. A
    /// returned `ScanCursor::START` means the iteration is complete; an
    /// empty page with any other cursor is not.
    fn iterate(&mut self, cursor: ScanCursor, options: &ScanOptions)
        -> Result<ScanBatch, StoreError>;

    /// Get the type of a key
    ///
    /// Returns `KeyType::None` if the key no longer exists.
    fn type_of(&mut self, key: &str) -> Result<KeyType, StoreError>;

    /// Get the type-appropriate size of a key
    ///
    /// Byte length for strings, field count for hashes, element count for
    /// lists, sets and sorted sets.
    fn size_of(&mut self, key: &str, key_type: &KeyType) -> Result<u64, StoreError>;
}

impl<S: KeyspaceStore + ?Sized> KeyspaceStore for &mut S {
    fn iterate(
        &mut self,
        cursor: ScanCursor,
        options: &ScanOptions,
    ) -> Result<ScanBatch, StoreError> {
        (**self).iterate(cursor, options)
    }

    fn type_of(&mut self, key: &str) -> Result<KeyType, StoreError> {
        (**self).type_of(key)
    }

    fn size_of(&mut self, key: &str, key_type: &KeyType) -> Result<u64, StoreError> {
        (**self).size_of(key, key_type)
    }
}

impl<S: KeyspaceStore + ?Sized> KeyspaceStore for Box<S> {
    fn iterate(
        &mut self,
        cursor: ScanCursor,
        options: &ScanOptions,
    ) -> Result<ScanBatch, StoreError> {
        (**self).iterate(cursor, options)
    }

    fn type_of(&mut self, key: &str) -> Result<KeyType, StoreError> {
        (**self).type_of(key)
    }

    fn size_of(&mut self, key: &str, key_type: &KeyType) -> Result<u64, StoreError> {
        (**self).size_of(key, key_type)
    }
}
