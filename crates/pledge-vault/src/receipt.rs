//! Vault receipts: the append-only trail of custody changes

use chrono::{DateTime, Utc};
use pledge_types::{AccountRef, Amount, TokenSelector};
use serde::{Deserialize, Serialize};

/// A receipt for a vault operation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultReceipt {
    /// Unique receipt identifier
    pub receipt_id: String,
    /// What operation was performed
    pub operation: VaultOperation,
    /// Asset involved
    pub token: TokenSelector,
    /// Amount involved
    pub amount: Amount,
    /// Who invoked the operation
    pub actor: AccountRef,
    /// Ledger bound or account paid, when applicable
    pub counterparty: Option<AccountRef>,
    /// When the operation occurred
    pub timestamp: DateTime<Utc>,
}

impl VaultReceipt {
    pub fn new(
        operation: VaultOperation,
        token: TokenSelector,
        amount: Amount,
        actor: AccountRef,
    ) -> Self {
        Self {
            receipt_id: uuid::Uuid::new_v4().to_string(),
            operation,
            token,
            amount,
            actor,
            counterparty: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_counterparty(mut self, counterparty: AccountRef) -> Self {
        self.counterparty = Some(counterparty);
        self
    }
}

/// Types of vault operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultOperation {
    /// Ledger bound to the vault
    Bind,
    /// Value credited by the ledger
    Receive,
    /// Routine payment directed by the ledger
    Disburse,
    /// Emergency withdrawal to the escape hatch destination
    Escape,
}
