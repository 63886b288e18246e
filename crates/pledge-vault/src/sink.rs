//! Outbound value transfer

use pledge_types::{AccountRef, Amount, PledgeResult, TokenSelector};
use std::collections::BTreeMap;
use tracing::debug;

/// Destination side of a transfer out of the vault.
///
/// Called only after the vault has committed its own debit. An error makes
/// the vault restore the debit and fail the operation.
pub trait ValueSink {
    fn pay(&mut self, to: &AccountRef, token: &TokenSelector, amount: Amount) -> PledgeResult<()>;
}

/// Observed balances of accounts outside the vault
#[derive(Clone, Debug, Default)]
pub struct AccountBook {
    balances: BTreeMap<(AccountRef, TokenSelector), Amount>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &AccountRef, token: &TokenSelector) -> Amount {
        self.balances
            .get(&(account.clone(), token.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub fn native_balance_of(&self, account: &AccountRef) -> Amount {
        self.balance_of(account, &TokenSelector::Native)
    }

    pub fn credit(
        &mut self,
        account: &AccountRef,
        token: &TokenSelector,
        amount: Amount,
    ) -> PledgeResult<()> {
        let entry = self
            .balances
            .entry((account.clone(), token.clone()))
            .or_default();
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    pub fn debit(
        &mut self,
        account: &AccountRef,
        token: &TokenSelector,
        amount: Amount,
    ) -> PledgeResult<()> {
        let current = self.balance_of(account, token);
        let next = current.checked_sub(amount)?;
        self.balances
            .insert((account.clone(), token.clone()), next);
        Ok(())
    }

    /// Total held across all accounts for one asset
    pub fn total(&self, token: &TokenSelector) -> PledgeResult<Amount> {
        Amount::checked_sum(
            self.balances
                .iter()
                .filter(|((_, t), _)| t == token)
                .map(|(_, amount)| *amount),
        )
    }
}

impl ValueSink for AccountBook {
    fn pay(&mut self, to: &AccountRef, token: &TokenSelector, amount: Amount) -> PledgeResult<()> {
        self.credit(to, token, amount)?;
        debug!(to = %to, token = %token, amount = amount.0, "Account credited");
        Ok(())
    }
}

/// Payments accepted by a staged vault, released once its new state is durable
#[derive(Clone, Debug, Default)]
pub struct PendingPayments {
    payments: Vec<(AccountRef, TokenSelector, Amount)>,
}

impl PendingPayments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Forward every held payment to `sink`, stopping at the first rejection
    pub fn settle(self, sink: &mut dyn ValueSink) -> PledgeResult<()> {
        for (to, token, amount) in self.payments {
            sink.pay(&to, &token, amount)?;
        }
        Ok(())
    }
}

impl ValueSink for PendingPayments {
    fn pay(&mut self, to: &AccountRef, token: &TokenSelector, amount: Amount) -> PledgeResult<()> {
        self.payments.push((to.clone(), token.clone(), amount));
        Ok(())
    }
}
