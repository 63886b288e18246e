//! Pledge Vault: sole custodian of pooled donations
//!
//! The vault holds value on behalf of the ledger and answers to three
//! independent identities:
//!
//! - **owner**: performs the one-time binding to a ledger
//! - **bound ledger**: credits donations and directs routine disbursements
//! - **escape hatch caller**: recovers funds to a fixed destination
//!
//! Every outbound transfer debits the vault before the value leaves, and
//! restores the debit if the transfer is rejected. A [`VaultHandle`] opened
//! over a store writes the vault record before a change becomes visible.

#![deny(unsafe_code)]

mod config;
mod handle;
mod receipt;
mod sink;
mod vault;

pub use config::VaultConfig;
pub use handle::{stage_vault, VaultHandle, VaultTxn};
pub use receipt::{VaultOperation, VaultReceipt};
pub use sink::{AccountBook, PendingPayments, ValueSink};
pub use vault::{LedgerBinding, Vault, RECEIPT_HISTORY};
