//! Persisted record layout and hydration

use pledge_storage::{PledgeStore, StoreKey, TypedStore, WriteBatch};
use pledge_types::{AdminId, Administrator, Amount, Pledge, PledgeError, PledgeId, PledgeResult};
use pledge_vault::Vault;
use serde::{Deserialize, Serialize};

pub(crate) const ADMIN_COUNT: &str = "admin_count";
pub(crate) const PLEDGE_COUNT: &str = "pledge_count";

/// Everything the coordinator keeps in the backing store
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub admins: Vec<Administrator>,
    pub pledges: Vec<Pledge>,
    /// Custody state, once a persistent vault has been deployed over the store
    pub vault: Option<Vault>,
}

impl LedgerSnapshot {
    /// Read every admin and pledge record, checking there are no gaps or strays
    pub fn load(store: &dyn PledgeStore) -> PledgeResult<Self> {
        let admin_count: u64 = store
            .get_typed(&StoreKey::meta(ADMIN_COUNT))?
            .unwrap_or(0);
        let pledge_count: u64 = store
            .get_typed(&StoreKey::meta(PLEDGE_COUNT))?
            .unwrap_or(0);

        let mut admins = Vec::with_capacity(admin_count as usize);
        for id in 1..=admin_count {
            let key = StoreKey::admin(AdminId::new(id));
            let admin: Administrator = store
                .get_typed(&key)?
                .ok_or_else(|| PledgeError::Corrupted(format!("missing record {}", key)))?;
            admins.push(admin);
        }

        let mut pledges = Vec::with_capacity(pledge_count as usize);
        for id in 1..=pledge_count {
            let key = StoreKey::pledge(PledgeId::new(id));
            let pledge: Pledge = store
                .get_typed(&key)?
                .ok_or_else(|| PledgeError::Corrupted(format!("missing record {}", key)))?;
            pledges.push(pledge);
        }

        check_no_strays(store, StoreKey::ADMIN_PREFIX, admin_count)?;
        check_no_strays(store, StoreKey::PLEDGE_PREFIX, pledge_count)?;

        let vault = store.get_typed(&StoreKey::vault())?;

        Ok(Self {
            admins,
            pledges,
            vault,
        })
    }

    pub fn total_pledged(&self) -> PledgeResult<Amount> {
        Amount::checked_sum(self.pledges.iter().map(|p| p.amount))
    }

    /// Native balance held by the recorded vault
    pub fn custodied(&self) -> Option<Amount> {
        self.vault.as_ref().map(Vault::balance_of)
    }
}

fn check_no_strays(store: &dyn PledgeStore, prefix: &str, count: u64) -> PledgeResult<()> {
    let stray = store
        .keys_with_prefix(prefix)?
        .into_iter()
        .find(|key| key.sequence().map_or(true, |seq| seq == 0 || seq > count));
    if let Some(key) = stray {
        return Err(PledgeError::Corrupted(format!(
            "record {} is outside the committed sequence (count {})",
            key, count
        )));
    }
    Ok(())
}

/// Batch writing one admin (and the counter when it is new)
pub(crate) fn admin_batch(admin: &Administrator, is_new: bool) -> PledgeResult<WriteBatch> {
    let mut batch = WriteBatch::new();
    batch.put(StoreKey::admin(admin.id), admin)?;
    if is_new {
        batch.put(StoreKey::meta(ADMIN_COUNT), &admin.id.0)?;
    }
    Ok(batch)
}

/// Batch writing one pledge (and the counter when it is new)
pub(crate) fn pledge_batch(pledge: &Pledge, is_new: bool) -> PledgeResult<WriteBatch> {
    let mut batch = WriteBatch::new();
    batch.put(StoreKey::pledge(pledge.id), pledge)?;
    if is_new {
        batch.put(StoreKey::meta(PLEDGE_COUNT), &pledge.id.0)?;
    }
    Ok(batch)
}
