//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Fields, Store, StorageError, StorageResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a SQLite store
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Store for SqliteStore {
    fn get_record(&self, key: &str) -> StorageResult<Option<Fields>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT field, value FROM records WHERE key = ?1")?;

        let rows = stmt.query_map(params![key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut fields = Fields::new();
        for row in rows {
            let (field, value) = row?;
            fields.insert(field, value);
        }

        Ok(if fields.is_empty() { None } else { Some(fields) })
    }

    fn put_record(&self, key: &str, fields: &Fields) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
            )?;
            for (field, value) in fields {
                stmt.execute(params![key, field, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT key FROM records WHERE substr(key, 1, ?2) = ?1 ORDER BY key",
        )?;

        let keys = stmt
            .query_map(params![prefix, prefix.chars().count() as i64], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    fn count_with_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT key) FROM records WHERE substr(key, 1, ?2) = ?1",
            params![prefix, prefix.chars().count() as i64],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn clear(&self) -> StorageResult<()> {
        self.conn()?.execute("DELETE FROM records", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_record_is_none() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.get_record("group:nothing").unwrap().is_none());
    }

    #[test]
    fn test_put_merges_fields() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .put_record("thread:1", &fields(&[("rawTitle", "A"), ("sourceUrl", "u")]))
            .unwrap();
        store
            .put_record("thread:1", &fields(&[("rawTitle", "B"), ("processedAt", "t")]))
            .unwrap();

        let record = store.get_record("thread:1").unwrap().unwrap();
        assert_eq!(
            record,
            fields(&[("processedAt", "t"), ("rawTitle", "B"), ("sourceUrl", "u")])
        );
    }

    #[test]
    fn test_prefix_queries_do_not_treat_underscore_as_wildcard() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.put_record("group:a_b", &fields(&[("x", "1")])).unwrap();
        store.put_record("group:axb", &fields(&[("x", "1")])).unwrap();
        store.put_record("release:a", &fields(&[("x", "1"), ("y", "2")])).unwrap();

        assert_eq!(
            store.keys_with_prefix("group:a_").unwrap(),
            vec!["group:a_b".to_string()]
        );
        assert_eq!(store.count_with_prefix("group:").unwrap(), 2);
        assert_eq!(store.count_with_prefix("release:").unwrap(), 1);
        assert_eq!(store.count_with_prefix("thread:").unwrap(), 0);
    }

    #[test]
    fn test_clear() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.put_record("group:a", &fields(&[("x", "1")])).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count_with_prefix("").unwrap(), 0);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.put_record("group:a", &fields(&[("displayTitle", "A")])).unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        let record = reopened.get_record("group:a").unwrap().unwrap();
        assert_eq!(record.get("displayTitle").map(String::as_str), Some("A"));
    }
}
