//! File-backed pledge store.
//!
//! The whole record map is rewritten after every batch (temp file, then
//! rename) so a crash leaves either the old or the new snapshot on disk.

use crate::key::{StoreKey, WriteBatch};
use crate::memory::{apply_ops, prefixed_keys};
use crate::traits::PledgeStore;
use crate::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoreData {
    records: BTreeMap<String, Value>,
}

/// JSON snapshot store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl JsonFileStore {
    /// Open a store, loading any existing snapshot at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.is_empty() {
                StoreData::default()
            } else {
                serde_json::from_slice(&bytes)?
            }
        } else {
            StoreData::default()
        };

        debug!(path = %path.display(), records = data.records.len(), "Opened pledge store");

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &StoreData) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

impl PledgeStore for JsonFileStore {
    fn get(&self, key: &StoreKey) -> StorageResult<Option<Value>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;
        Ok(guard.records.get(key.as_str()).cloned())
    }

    fn apply(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;

        // Disk first; memory only changes once the snapshot is durable.
        let mut next = guard.clone();
        apply_ops(&mut next.records, batch);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<StoreKey>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;
        Ok(prefixed_keys(&guard.records, prefix))
    }

    fn backend_label(&self) -> &'static str {
        "json-file"
    }
}
