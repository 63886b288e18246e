//! In-memory reference implementation of the pledge store.
//!
//! Deterministic and test-friendly. Data lives only as long as the process;
//! use [`crate::JsonFileStore`] when records must survive a restart.

use crate::key::{StoreKey, WriteBatch, WriteOp};
use crate::traits::PledgeStore;
use crate::{StorageError, StorageResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory pledge store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> StorageResult<usize> {
        let guard = self
            .records
            .read()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;
        Ok(guard.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Apply ops in order against a record map.
pub(crate) fn apply_ops(records: &mut BTreeMap<String, Value>, batch: WriteBatch) {
    for op in batch.into_ops() {
        match op {
            WriteOp::Put(key, value) => {
                records.insert(key.0, value);
            }
            WriteOp::Delete(key) => {
                records.remove(&key.0);
            }
        }
    }
}

pub(crate) fn prefixed_keys(records: &BTreeMap<String, Value>, prefix: &str) -> Vec<StoreKey> {
    let mut keys = records
        .keys()
        .filter(|k| k.starts_with(prefix))
        .map(|k| StoreKey::new(k.clone()))
        .collect::<Vec<_>>();
    keys.sort_by_key(|k| (k.sequence(), k.0.clone()));
    keys
}

impl PledgeStore for InMemoryStore {
    fn get(&self, key: &StoreKey) -> StorageResult<Option<Value>> {
        let guard = self
            .records
            .read()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;
        Ok(guard.get(key.as_str()).cloned())
    }

    fn apply(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;
        apply_ops(&mut guard, batch);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<StoreKey>> {
        let guard = self
            .records
            .read()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;
        Ok(prefixed_keys(&guard, prefix))
    }

    fn backend_label(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypedStore;
    use pledge_types::{AdminId, PledgeId};

    #[test]
    fn batch_is_visible_after_apply() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(StoreKey::meta("admin_count"), &2u64).unwrap();
        batch.put(StoreKey::admin(AdminId::new(1)), &"giver").unwrap();
        store.apply(batch).unwrap();

        let count: Option<u64> = store.get_typed(&StoreKey::meta("admin_count")).unwrap();
        assert_eq!(count, Some(2));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn delete_removes_record() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(StoreKey::pledge(PledgeId::new(1)), &10u64).unwrap();
        store.apply(batch).unwrap();

        let mut batch = WriteBatch::new();
        batch.delete(StoreKey::pledge(PledgeId::new(1)));
        store.apply(batch).unwrap();

        assert!(store.get(&StoreKey::pledge(PledgeId::new(1))).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn prefix_scan_sorts_numerically() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        for id in [10u64, 2, 1] {
            batch.put(StoreKey::admin(AdminId::new(id)), &id).unwrap();
        }
        batch.put(StoreKey::meta("admin_count"), &3u64).unwrap();
        store.apply(batch).unwrap();

        let keys = store.keys_with_prefix(StoreKey::ADMIN_PREFIX).unwrap();
        let ids: Vec<u64> = keys.iter().filter_map(StoreKey::sequence).collect();
        assert_eq!(ids, vec![1, 2, 10]);
    }
}
