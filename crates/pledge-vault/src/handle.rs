//! Shared, optionally persisted access to a vault

use crate::sink::{PendingPayments, ValueSink};
use crate::vault::Vault;
use pledge_storage::{PledgeStore, StoreKey, TypedStore, WriteBatch};
use pledge_types::{AccountRef, Amount, PledgeError, PledgeResult, TokenSelector};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info};

/// Shared access to a vault.
///
/// The ledger coordinator credits through one clone while administrators
/// reach the escape hatch through another. The write lock serializes every
/// custody change. When the handle has a store, each change is written to
/// [`StoreKey::vault`] before it becomes visible.
#[derive(Clone)]
pub struct VaultHandle {
    inner: Arc<RwLock<Vault>>,
    store: Option<Arc<dyn PledgeStore>>,
}

impl std::fmt::Debug for VaultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultHandle")
            .field("inner", &self.inner)
            .field("store", &self.store.as_ref().map(|s| s.backend_label()))
            .finish()
    }
}

/// A staged change to a vault, holding its write lock.
///
/// Mutations apply to a copy; [`VaultTxn::commit`] swaps the copy in.
/// Dropping the transaction discards them.
pub struct VaultTxn<'a> {
    guard: RwLockWriteGuard<'a, Vault>,
    staged: Vault,
}

impl VaultTxn<'_> {
    /// State as of the start of the transaction
    pub fn current(&self) -> &Vault {
        &self.guard
    }

    pub fn staged(&self) -> &Vault {
        &self.staged
    }

    pub fn staged_mut(&mut self) -> &mut Vault {
        &mut self.staged
    }

    pub fn commit(self) {
        let VaultTxn { mut guard, staged } = self;
        *guard = staged;
    }
}

/// Stage the vault record into `batch`
pub fn stage_vault(batch: &mut WriteBatch, vault: &Vault) -> PledgeResult<()> {
    batch.put(StoreKey::vault(), vault)?;
    Ok(())
}

impl VaultHandle {
    /// Share a vault kept in memory only
    pub fn new(vault: Vault) -> Self {
        Self {
            inner: Arc::new(RwLock::new(vault)),
            store: None,
        }
    }

    /// Share a vault whose state is written to `store` on every change
    pub fn persistent(vault: Vault, store: Arc<dyn PledgeStore>) -> PledgeResult<Self> {
        write_record(store.as_ref(), &vault)?;
        info!(backend = store.backend_label(), "Vault record created");
        Ok(Self {
            inner: Arc::new(RwLock::new(vault)),
            store: Some(store),
        })
    }

    /// Reopen the vault recorded in `store`, if there is one
    pub fn load(store: Arc<dyn PledgeStore>) -> PledgeResult<Option<Self>> {
        let vault: Option<Vault> = store.get_typed(&StoreKey::vault())?;
        Ok(vault.map(|vault| {
            info!(
                backend = store.backend_label(),
                balance = vault.balance_of().0,
                bound = vault.binding().is_bound(),
                "Vault record loaded"
            );
            Self {
                inner: Arc::new(RwLock::new(vault)),
                store: Some(store),
            }
        }))
    }

    pub fn store(&self) -> Option<&Arc<dyn PledgeStore>> {
        self.store.as_ref()
    }

    pub fn read(&self) -> PledgeResult<RwLockReadGuard<'_, Vault>> {
        self.inner
            .read()
            .map_err(|_| PledgeError::Storage("vault lock poisoned".to_string()))
    }

    /// Start a staged change. Callers persisting the staged state themselves
    /// (alongside their own records) use this.
    pub fn begin(&self) -> PledgeResult<VaultTxn<'_>> {
        let guard = self
            .inner
            .write()
            .map_err(|_| PledgeError::Storage("vault lock poisoned".to_string()))?;
        let staged = guard.clone();
        Ok(VaultTxn { guard, staged })
    }

    pub fn balance_of(&self) -> PledgeResult<Amount> {
        Ok(self.read()?.balance_of())
    }

    pub fn token_balance_of(&self, token: &TokenSelector) -> PledgeResult<Amount> {
        Ok(self.read()?.token_balance_of(token))
    }

    pub fn bind_ledger(&self, caller: &AccountRef, ledger: AccountRef) -> PledgeResult<()> {
        let mut txn = self.begin()?;
        txn.staged_mut().bind_ledger(caller, ledger)?;
        self.persist(txn.staged())?;
        txn.commit();
        Ok(())
    }

    pub fn receive_token(
        &self,
        caller: &AccountRef,
        token: &AccountRef,
        amount: Amount,
    ) -> PledgeResult<()> {
        let mut txn = self.begin()?;
        txn.staged_mut().receive_token(caller, token, amount)?;
        self.persist(txn.staged())?;
        txn.commit();
        Ok(())
    }

    /// Escape hatch with the debit made durable before value leaves.
    ///
    /// If `sink` rejects the payment the prior record is written back.
    pub fn escape_funds(
        &self,
        caller: &AccountRef,
        token: &TokenSelector,
        amount: Amount,
        sink: &mut dyn ValueSink,
    ) -> PledgeResult<()> {
        let mut txn = self.begin()?;
        let mut pending = PendingPayments::new();
        txn.staged_mut()
            .escape_funds(caller, token, amount, &mut pending)?;
        self.persist(txn.staged())?;

        if let Err(err) = pending.settle(sink) {
            if let Err(undo_err) = self.persist(txn.current()) {
                error!(error = %undo_err, "Vault record could not be restored");
                return Err(PledgeError::Corrupted(format!(
                    "vault restore failed after '{}': {}",
                    err, undo_err
                )));
            }
            return Err(err);
        }
        txn.commit();
        Ok(())
    }

    fn persist(&self, vault: &Vault) -> PledgeResult<()> {
        match &self.store {
            Some(store) => write_record(store.as_ref(), vault),
            None => Ok(()),
        }
    }
}

fn write_record(store: &dyn PledgeStore, vault: &Vault) -> PledgeResult<()> {
    let mut batch = WriteBatch::new();
    stage_vault(&mut batch, vault)?;
    store.apply(batch)?;
    Ok(())
}

impl From<Vault> for VaultHandle {
    fn from(vault: Vault) -> Self {
        Self::new(vault)
    }
}
