//! Deployment configuration

use crate::coordinator::LiquidLedger;
use pledge_storage::StorageConfig;
use pledge_types::{AccountRef, PledgeError, PledgeResult};
use pledge_vault::{Vault, VaultConfig, VaultHandle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything needed to stand up a vault and its ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Identity the ledger acts under when crediting the vault
    pub ledger_address: AccountRef,
    pub vault: VaultConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl DeploymentConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Stand up the ledger and its vault over the configured store.
    ///
    /// The first run deploys the vault, records it, and binds it to the
    /// ledger as the vault owner. Later runs reopen the recorded vault, so
    /// custody and the binding carry over.
    pub fn deploy(&self) -> PledgeResult<LiquidLedger> {
        let store = self.storage.open()?;
        let vault = match VaultHandle::load(store.clone())? {
            Some(vault) => {
                let recorded = vault.read()?;
                if recorded.owner() != &self.vault.owner
                    || recorded.escape_hatch_caller() != &self.vault.escape_hatch_caller
                    || recorded.escape_hatch_destination() != &self.vault.escape_hatch_destination
                {
                    return Err(PledgeError::Corrupted(format!(
                        "store records the vault owned by {}, not {}",
                        recorded.owner(),
                        self.vault.owner
                    )));
                }
                drop(recorded);
                vault
            }
            None => VaultHandle::persistent(Vault::from_config(self.vault.clone())?, store.clone())?,
        };
        let ledger = LiquidLedger::open(self.ledger_address.clone(), store, vault.clone())?;

        let bound = vault.read()?.bound_ledger().cloned();
        match bound {
            None => vault.bind_ledger(&self.vault.owner, ledger.address().clone())?,
            Some(bound) if &bound == ledger.address() => {}
            Some(bound) => return Err(PledgeError::AlreadyBound(bound)),
        }

        info!(
            ledger = %self.ledger_address,
            storage = self.storage.label(),
            custodied = vault.balance_of()?.0,
            "Deployment ready"
        );
        Ok(ledger)
    }
}
