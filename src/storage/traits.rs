//! Storage traits and error types
//!
//! The catalog is kept in a generic key-value store whose records are flat
//! field maps. This module defines the trait every backend implements and the
//! associated error types.

use std::collections::BTreeMap;
use thiserror::Error;

/// A record as stored: field name to string value
pub type Fields = BTreeMap<String, String>;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed record {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for key-value store backends
///
/// Implementations must be safe to share between concurrently running
/// harvest tasks. No transactions span calls: each call is atomic on its own.
pub trait Store: Send + Sync {
    /// Gets every field of a record, or None if the key has no fields
    fn get_record(&self, key: &str) -> StorageResult<Option<Fields>>;

    /// Writes the given fields into a record
    ///
    /// Fields not named in `fields` are left untouched, so repeated writes
    /// merge into the stored record rather than replacing it.
    fn put_record(&self, key: &str, fields: &Fields) -> StorageResult<()>;

    /// Lists all keys starting with `prefix`, in ascending order
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Counts the keys starting with `prefix`
    fn count_with_prefix(&self, prefix: &str) -> StorageResult<usize> {
        Ok(self.keys_with_prefix(prefix)?.len())
    }

    /// Removes every record
    fn clear(&self) -> StorageResult<()>;
}
