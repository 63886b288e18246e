use crate::file::JsonFileStore;
use crate::memory::InMemoryStore;
use crate::traits::PledgeStore;
use crate::StorageResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Pledge store backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Keep registry and pledge records in process memory only.
    #[default]
    Memory,
    /// Persist records to a JSON snapshot file and reload on open.
    JsonFile { path: PathBuf },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        Self::JsonFile { path: path.into() }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::JsonFile { .. } => "json-file",
        }
    }

    /// Open the configured backend, shared by the ledger and its vault.
    pub fn open(&self) -> StorageResult<Arc<dyn PledgeStore>> {
        match self {
            Self::Memory => Ok(Arc::new(InMemoryStore::new())),
            Self::JsonFile { path } => Ok(Arc::new(JsonFileStore::open(path.clone())?)),
        }
    }
}
