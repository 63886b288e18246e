use pledge_types::AccountRef;
use serde::{Deserialize, Serialize};

/// Identities fixed at vault deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Account allowed to bind the vault to a ledger.
    pub owner: AccountRef,
    /// Sole account allowed to trigger emergency withdrawal.
    pub escape_hatch_caller: AccountRef,
    /// Fixed recipient of emergency withdrawals.
    pub escape_hatch_destination: AccountRef,
}

impl VaultConfig {
    pub fn new(
        owner: AccountRef,
        escape_hatch_caller: AccountRef,
        escape_hatch_destination: AccountRef,
    ) -> Self {
        Self {
            owner,
            escape_hatch_caller,
            escape_hatch_destination,
        }
    }
}
