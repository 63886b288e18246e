//! Liquid pledge storage abstractions.
//!
//! The ledger keeps its registry and pledge records behind a narrow
//! key-value contract so the coordinator logic can be replaced without
//! losing data:
//! - `get` one record by key
//! - `apply` an atomic batch of writes
//! - `keys_with_prefix` for integrity scans on hydration
//!
//! Design stance:
//! - Reads are strongly consistent with the most recent applied batch.
//! - A batch is either fully visible or not at all.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod config;
mod error;
pub mod file;
mod key;
pub mod memory;
mod traits;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use file::JsonFileStore;
pub use key::{StoreKey, WriteBatch, WriteOp};
pub use memory::InMemoryStore;
pub use traits::{PledgeStore, TypedStore};
