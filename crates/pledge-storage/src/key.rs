use crate::StorageResult;
use pledge_types::{AdminId, PledgeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record id inside the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey(pub String);

impl StoreKey {
    pub const ADMIN_PREFIX: &'static str = "admin/";
    pub const PLEDGE_PREFIX: &'static str = "pledge/";
    pub const META_PREFIX: &'static str = "meta/";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn admin(id: AdminId) -> Self {
        Self(format!("{}{}", Self::ADMIN_PREFIX, id.0))
    }

    pub fn pledge(id: PledgeId) -> Self {
        Self(format!("{}{}", Self::PLEDGE_PREFIX, id.0))
    }

    pub fn meta(name: &str) -> Self {
        Self(format!("{}{}", Self::META_PREFIX, name))
    }

    /// The single vault record.
    pub fn vault() -> Self {
        Self::meta("vault")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix for `admin/{n}` and `pledge/{n}` keys.
    pub fn sequence(&self) -> Option<u64> {
        self.0.rsplit('/').next().and_then(|s| s.parse().ok())
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single staged mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    Put(StoreKey, Value),
    Delete(StoreKey),
}

impl WriteOp {
    pub fn key(&self) -> &StoreKey {
        match self {
            WriteOp::Put(key, _) | WriteOp::Delete(key) => key,
        }
    }
}

/// Ordered set of writes applied atomically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a serialized record.
    pub fn put<T: Serialize>(&mut self, key: StoreKey, value: &T) -> StorageResult<()> {
        self.ops.push(WriteOp::Put(key, serde_json::to_value(value)?));
        Ok(())
    }

    pub fn delete(&mut self, key: StoreKey) {
        self.ops.push(WriteOp::Delete(key));
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
