//! Ledger Coordinator: routes donations into pledges and custody into the vault
//!
//! Every custody operation follows the same shape:
//!
//! 1. plan the new pledge record against in-memory state
//! 2. stage the vault change on a copy, under the vault write lock
//! 3. persist the pledge record and the staged vault in one batch
//! 4. commit both in memory
//!
//! Outbound value is held by the staged vault and only released after step
//! 3. If the destination rejects it, the prior records are written back and
//! the in-memory state is left as it was.

use crate::pledges::PledgeBook;
use crate::registry::AdminRegistry;
use crate::snapshot::{self, LedgerSnapshot};
use pledge_storage::{PledgeStore, WriteBatch};
use pledge_types::{
    AccountRef, AdminId, AdminUpdate, Administrator, Amount, CallContext, Pledge, PledgeError,
    PledgeId, PledgeKey, PledgeResult, TokenSelector,
};
use pledge_vault::{stage_vault, PendingPayments, ValueSink, Vault, VaultHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Pledged value versus value actually in custody
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyReport {
    /// Sum of all pledge amounts
    pub pledged: Amount,
    /// Native balance held by the vault
    pub custodied: Amount,
    /// Pledged value no longer in custody (escape hatch withdrawals)
    pub shortfall: Amount,
}

impl CustodyReport {
    /// Custody and attribution agree exactly
    pub fn is_balanced(&self) -> bool {
        self.pledged == self.custodied
    }
}

/// The ledger coordinator
pub struct LiquidLedger {
    address: AccountRef,
    registry: AdminRegistry,
    pledges: PledgeBook,
    store: Arc<dyn PledgeStore>,
    vault: VaultHandle,
}

impl LiquidLedger {
    /// Open a ledger over `store`, picking up any records already in it.
    ///
    /// `address` is the identity the vault must be bound to before donations
    /// are accepted. A persistent `vault` must be recorded in the same store,
    /// and a store that already records a vault only accepts that vault.
    pub fn open(
        address: AccountRef,
        store: Arc<dyn PledgeStore>,
        vault: VaultHandle,
    ) -> PledgeResult<Self> {
        address.validate()?;
        if let Some(vault_store) = vault.store() {
            if !std::ptr::addr_eq(Arc::as_ptr(vault_store), Arc::as_ptr(&store)) {
                return Err(PledgeError::Storage(
                    "vault is recorded in a different store".to_string(),
                ));
            }
        }
        let snapshot = LedgerSnapshot::load(store.as_ref())?;
        if let Some(recorded) = &snapshot.vault {
            check_same_vault(recorded, &*vault.read()?)?;
        }
        let registry = AdminRegistry::from_admins(snapshot.admins)?;
        let pledges = PledgeBook::from_pledges(snapshot.pledges)?;

        info!(
            ledger = %address,
            backend = store.backend_label(),
            admins = registry.count(),
            pledges = pledges.count(),
            "Ledger opened"
        );

        Ok(Self {
            address,
            registry,
            pledges,
            store,
            vault,
        })
    }

    /// Detach the backing store, e.g. to reopen it under new coordinator logic
    pub fn into_store(self) -> Arc<dyn PledgeStore> {
        self.store
    }

    // --- Admin operations ---

    pub fn add_giver(
        &mut self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
        commit_time: u64,
    ) -> PledgeResult<AdminId> {
        let admin = self.registry.plan_giver(addr, name, url, commit_time)?;
        self.persist_new_admin(admin)
    }

    pub fn add_delegate(
        &mut self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
        commit_time: u64,
    ) -> PledgeResult<AdminId> {
        let admin = self.registry.plan_delegate(addr, name, url, commit_time)?;
        self.persist_new_admin(admin)
    }

    pub fn add_project(
        &mut self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
        parent: Option<AdminId>,
        commit_time: u64,
    ) -> PledgeResult<AdminId> {
        let admin = self
            .registry
            .plan_project(addr, name, url, parent, commit_time)?;
        self.persist_new_admin(admin)
    }

    /// Change an admin's metadata. Only the admin's own address may do this.
    pub fn update_admin(
        &mut self,
        caller: &AccountRef,
        id: AdminId,
        update: &AdminUpdate,
    ) -> PledgeResult<()> {
        let admin = self.registry.plan_update(caller, id, update)?;
        self.store.apply(snapshot::admin_batch(&admin, false)?)?;
        self.registry.replace(admin)?;
        info!(admin = %id, "Admin updated");
        Ok(())
    }

    fn persist_new_admin(&mut self, admin: Administrator) -> PledgeResult<AdminId> {
        self.store.apply(snapshot::admin_batch(&admin, true)?)?;
        let kind = admin.kind;
        let addr = admin.addr.clone();
        let id = self.registry.commit(admin)?;
        info!(admin = %id, kind = %kind, addr = %addr, "Admin added");
        Ok(id)
    }

    // --- Custody operations ---

    /// Accept a donation of `amount` for `to_admin`.
    ///
    /// `from_pledge` records provenance; 0 means a fresh, unattributed
    /// contribution. The value attached to `ctx` must equal `amount`.
    /// Returns the credited pledge.
    pub fn donate(
        &mut self,
        ctx: &CallContext,
        from_pledge: PledgeId,
        to_admin: AdminId,
        amount: Amount,
    ) -> PledgeResult<PledgeId> {
        if amount.is_zero() || ctx.value != amount {
            warn!(
                donor = %ctx.caller,
                declared = amount.0,
                attached = ctx.value.0,
                "Rejected donation: value mismatch"
            );
            return Err(PledgeError::ValueMismatch {
                declared: amount.0,
                attached: ctx.value.0,
            });
        }
        self.registry.resolve(to_admin)?;
        if !from_pledge.is_unattributed() {
            self.pledges.get(from_pledge)?;
        }

        let key = PledgeKey::new(to_admin, from_pledge);
        let is_new = self.pledges.find(key).is_none();
        let planned = self.pledges.plan_credit(key, amount)?;

        let mut vault = self.vault.begin()?;
        vault.staged_mut().receive(&self.address, amount)?;

        let mut batch = snapshot::pledge_batch(&planned, is_new)?;
        stage_custody(&mut batch, &self.vault, vault.staged())?;
        self.store.apply(batch)?;

        self.pledges.commit(planned.clone())?;
        vault.commit();

        info!(
            donor = %ctx.caller,
            pledge = %planned.id,
            owner = %to_admin,
            origin = %from_pledge,
            amount = amount.0,
            "Donation accepted"
        );
        Ok(planned.id)
    }

    /// Pay out part of a pledge to its owner's address.
    ///
    /// Only the owning admin's `addr` may withdraw. The debited pledge and
    /// vault are persisted before the payment is released, and restored if
    /// the destination rejects it.
    pub fn withdraw(
        &mut self,
        caller: &AccountRef,
        pledge_id: PledgeId,
        amount: Amount,
        sink: &mut dyn ValueSink,
    ) -> PledgeResult<()> {
        let previous = self.pledges.get(pledge_id)?.clone();
        let owner = self.registry.resolve(previous.owner)?;
        if !owner.is_controlled_by(caller) {
            warn!(caller = %caller, pledge = %pledge_id, "Rejected withdrawal: not the pledge owner");
            return Err(PledgeError::unauthorized("pledge owner", caller));
        }
        let destination = owner.addr.clone();
        let planned = self.pledges.plan_debit(pledge_id, amount)?;

        let mut vault = self.vault.begin()?;
        let mut pending = PendingPayments::new();
        vault.staged_mut().disburse(
            &self.address,
            &TokenSelector::Native,
            &destination,
            amount,
            &mut pending,
        )?;

        let mut batch = snapshot::pledge_batch(&planned, false)?;
        stage_custody(&mut batch, &self.vault, vault.staged())?;
        self.store.apply(batch)?;
        self.pledges.commit(planned)?;

        if let Err(err) = pending.settle(sink) {
            let mut undo = snapshot::pledge_batch(&previous, false)?;
            stage_custody(&mut undo, &self.vault, vault.current())?;
            restore_withdrawal(self.store.as_ref(), &mut self.pledges, undo, previous, &err)?;
            return Err(err);
        }
        vault.commit();

        info!(
            pledge = %pledge_id,
            destination = %destination,
            amount = amount.0,
            "Withdrawal paid"
        );
        Ok(())
    }

    // --- Query methods ---

    pub fn address(&self) -> &AccountRef {
        &self.address
    }

    pub fn number_of_pledge_admins(&self) -> u64 {
        self.registry.count()
    }

    pub fn admin(&self, id: AdminId) -> PledgeResult<&Administrator> {
        self.registry.resolve(id)
    }

    pub fn registry(&self) -> &AdminRegistry {
        &self.registry
    }

    pub fn number_of_pledges(&self) -> u64 {
        self.pledges.count()
    }

    pub fn pledge(&self, id: PledgeId) -> PledgeResult<&Pledge> {
        self.pledges.get(id)
    }

    pub fn pledges_owned_by(&self, owner: AdminId) -> Vec<&Pledge> {
        self.pledges.owned_by(owner)
    }

    pub fn store(&self) -> &Arc<dyn PledgeStore> {
        &self.store
    }

    pub fn total_pledged(&self) -> Amount {
        self.pledges.total()
    }

    pub fn vault(&self) -> &VaultHandle {
        &self.vault
    }

    pub fn custody_report(&self) -> PledgeResult<CustodyReport> {
        let pledged = self.pledges.total();
        let custodied = self.vault.balance_of()?;
        if custodied > pledged {
            return Err(PledgeError::Corrupted(format!(
                "vault holds {} but only {} is pledged",
                custodied, pledged
            )));
        }
        Ok(CustodyReport {
            pledged,
            custodied,
            shortfall: Amount::new(pledged.0 - custodied.0),
        })
    }
}

/// A store that already records a vault belongs to that vault
fn check_same_vault(recorded: &Vault, given: &Vault) -> PledgeResult<()> {
    if recorded.owner() != given.owner()
        || recorded.escape_hatch_caller() != given.escape_hatch_caller()
        || recorded.escape_hatch_destination() != given.escape_hatch_destination()
    {
        return Err(PledgeError::Corrupted(format!(
            "store records the vault owned by {}, not {}",
            recorded.owner(),
            given.owner()
        )));
    }
    Ok(())
}

/// Record the vault alongside the ledger's own records when it is persistent.
/// A memory-only vault leaves no record behind.
fn stage_custody(batch: &mut WriteBatch, handle: &VaultHandle, vault: &Vault) -> PledgeResult<()> {
    if handle.store().is_some() {
        stage_vault(batch, vault)?;
    }
    Ok(())
}

/// Write back the records of a withdrawal whose payment was rejected
fn restore_withdrawal(
    store: &dyn PledgeStore,
    pledges: &mut PledgeBook,
    undo: WriteBatch,
    previous: Pledge,
    cause: &PledgeError,
) -> PledgeResult<()> {
    let id = previous.id;
    warn!(pledge = %id, cause = %cause, "Payment rejected; restoring pledge and vault records");

    if let Err(undo_err) = store.apply(undo) {
        error!(pledge = %id, error = %undo_err, "Withdrawal restore could not be persisted");
        return Err(PledgeError::Corrupted(format!(
            "restore of pledge {} failed after '{}': {}",
            id, cause, undo_err
        )));
    }
    pledges.commit(previous)
}
