//! Liquid pledge ledger.
//!
//! Owns the admin registry and the pledge records, and is the only party a
//! bound vault accepts routine custody changes from. Records live behind a
//! detachable [`pledge_storage::PledgeStore`] so the coordinator can be
//! replaced without losing data.

#![deny(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod pledges;
pub mod registry;
pub mod snapshot;

pub use config::{ConfigError, DeploymentConfig};
pub use coordinator::{CustodyReport, LiquidLedger};
pub use pledges::PledgeBook;
pub use registry::AdminRegistry;
pub use snapshot::LedgerSnapshot;
