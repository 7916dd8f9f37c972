//! In-memory storage implementation

use crate::storage::traits::{Fields, Store, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Store backed by a map in memory, used for dry runs and tests
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Fields>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, Fields>>> {
        self.records.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Store for MemoryStore {
    fn get_record(&self, key: &str) -> StorageResult<Option<Fields>> {
        Ok(self.records()?.get(key).filter(|f| !f.is_empty()).cloned())
    }

    fn put_record(&self, key: &str, fields: &Fields) -> StorageResult<()> {
        let mut records = self.records()?;
        let record = records.entry(key.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .records()?
            .iter()
            .filter(|(key, fields)| key.starts_with(prefix) && !fields.is_empty())
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn clear(&self) -> StorageResult<()> {
        self.records()?.clear();
        Ok(())
    }
}
