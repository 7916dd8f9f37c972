//! Storage module for the release catalog
//!
//! This module handles persistence of catalog records, including:
//! - The generic key-value `Store` trait
//! - A SQLite backend and an in-memory backend
//! - Typed records and their flat field-map encoding

mod memory;
mod records;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use records::{
    encode_set, group_key, parse_timestamp, release_key, thread_key, ReleaseRecord,
    ReleaseThread, ShowGroup, GROUP_PREFIX, RELEASE_PREFIX, THREAD_PREFIX,
};
pub use sqlite::SqliteStore;
pub use traits::{Fields, Store, StorageError, StorageResult};

use std::path::Path;

/// Opens the SQLite-backed catalog store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}
