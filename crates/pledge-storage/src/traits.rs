use crate::key::{StoreKey, WriteBatch};
use crate::StorageResult;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Narrow get/set contract backing the ledger coordinator.
pub trait PledgeStore: Send + Sync {
    /// Read one record by key.
    fn get(&self, key: &StoreKey) -> StorageResult<Option<Value>>;

    /// Apply every write in the batch, or none of them.
    fn apply(&self, batch: WriteBatch) -> StorageResult<()>;

    /// List keys under a prefix, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<StoreKey>>;

    /// Short backend name for logs.
    fn backend_label(&self) -> &'static str;
}

/// Typed reads on top of [`PledgeStore`].
pub trait TypedStore {
    fn get_typed<T: DeserializeOwned>(&self, key: &StoreKey) -> StorageResult<Option<T>>;
}

impl<S: PledgeStore + ?Sized> TypedStore for S {
    fn get_typed<T: DeserializeOwned>(&self, key: &StoreKey) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
