//! The vault: custodied balances and the roles allowed to move them

use crate::config::VaultConfig;
use crate::receipt::{VaultOperation, VaultReceipt};
use crate::sink::ValueSink;
use chrono::{DateTime, Utc};
use pledge_types::{AccountRef, Amount, PledgeError, PledgeResult, TokenSelector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Receipts kept on the vault; older ones are dropped first
pub const RECEIPT_HISTORY: usize = 256;

/// Which ledger, if any, directs routine custody
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LedgerBinding {
    /// No ledger yet; only the escape hatch can move funds
    #[default]
    Unbound,
    /// Permanently bound
    Bound {
        ledger: AccountRef,
        bound_at: DateTime<Utc>,
    },
}

impl LedgerBinding {
    /// `Unbound -> Bound`. There is no way back.
    pub fn bind(&self, ledger: AccountRef) -> PledgeResult<LedgerBinding> {
        match self {
            LedgerBinding::Unbound => Ok(LedgerBinding::Bound {
                ledger,
                bound_at: Utc::now(),
            }),
            LedgerBinding::Bound { ledger, .. } => Err(PledgeError::AlreadyBound(ledger.clone())),
        }
    }

    pub fn ledger(&self) -> Option<&AccountRef> {
        match self {
            LedgerBinding::Unbound => None,
            LedgerBinding::Bound { ledger, .. } => Some(ledger),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, LedgerBinding::Bound { .. })
    }
}

/// Custodial vault
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault {
    owner: AccountRef,
    escape_hatch_caller: AccountRef,
    escape_hatch_destination: AccountRef,
    binding: LedgerBinding,
    balance: Amount,
    token_balances: BTreeMap<AccountRef, Amount>,
    receipts: Vec<VaultReceipt>,
    deployed_at: DateTime<Utc>,
}

impl Vault {
    /// Deploy an unbound vault with its three fixed identities
    pub fn deploy(
        owner: AccountRef,
        escape_hatch_caller: AccountRef,
        escape_hatch_destination: AccountRef,
    ) -> PledgeResult<Self> {
        owner.validate()?;
        escape_hatch_caller.validate()?;
        escape_hatch_destination.validate()?;

        info!(
            owner = %owner,
            escape_hatch_caller = %escape_hatch_caller,
            escape_hatch_destination = %escape_hatch_destination,
            "Vault deployed"
        );

        Ok(Self {
            owner,
            escape_hatch_caller,
            escape_hatch_destination,
            binding: LedgerBinding::Unbound,
            balance: Amount::zero(),
            token_balances: BTreeMap::new(),
            receipts: Vec::new(),
            deployed_at: Utc::now(),
        })
    }

    pub fn from_config(config: VaultConfig) -> PledgeResult<Self> {
        Self::deploy(
            config.owner,
            config.escape_hatch_caller,
            config.escape_hatch_destination,
        )
    }

    // --- Guards ---

    pub fn require_owner(&self, caller: &AccountRef) -> PledgeResult<()> {
        if caller != &self.owner {
            warn!(caller = %caller, "Rejected: caller is not the vault owner");
            return Err(PledgeError::unauthorized("vault owner", caller));
        }
        Ok(())
    }

    pub fn require_escape_hatch_caller(&self, caller: &AccountRef) -> PledgeResult<()> {
        if caller != &self.escape_hatch_caller {
            warn!(caller = %caller, "Rejected: caller is not the escape hatch caller");
            return Err(PledgeError::unauthorized("escape hatch caller", caller));
        }
        Ok(())
    }

    pub fn require_bound_ledger(&self, caller: &AccountRef) -> PledgeResult<()> {
        match &self.binding {
            LedgerBinding::Unbound => Err(PledgeError::NotBound),
            LedgerBinding::Bound { ledger, .. } if ledger == caller => Ok(()),
            LedgerBinding::Bound { .. } => {
                warn!(caller = %caller, "Rejected: caller is not the bound ledger");
                Err(PledgeError::unauthorized("bound ledger", caller))
            }
        }
    }

    // --- Binding ---

    /// Bind the ledger allowed to direct routine custody. Owner only, once.
    pub fn bind_ledger(&mut self, caller: &AccountRef, ledger: AccountRef) -> PledgeResult<()> {
        self.require_owner(caller)?;
        ledger.validate()?;

        self.binding = self.binding.bind(ledger.clone())?;

        info!(ledger = %ledger, "Vault bound to ledger");
        self.record(
            VaultReceipt::new(
                VaultOperation::Bind,
                TokenSelector::Native,
                Amount::zero(),
                caller.clone(),
            )
            .with_counterparty(ledger),
        );
        Ok(())
    }

    // --- Inbound ---

    /// Validate a `receive` without touching state
    pub fn check_receive(&self, caller: &AccountRef, amount: Amount) -> PledgeResult<()> {
        self.require_bound_ledger(caller)?;
        self.balance.checked_add(amount)?;
        Ok(())
    }

    /// Credit value forwarded by the bound ledger
    pub fn receive(&mut self, caller: &AccountRef, amount: Amount) -> PledgeResult<()> {
        self.check_receive(caller, amount)?;
        self.balance = self.balance.checked_add(amount)?;

        info!(
            amount = amount.0,
            balance = self.balance.0,
            "Vault received funds"
        );
        self.record(VaultReceipt::new(
            VaultOperation::Receive,
            TokenSelector::Native,
            amount,
            caller.clone(),
        ));
        Ok(())
    }

    /// Credit a tracked token balance forwarded by the bound ledger
    pub fn receive_token(
        &mut self,
        caller: &AccountRef,
        token: &AccountRef,
        amount: Amount,
    ) -> PledgeResult<()> {
        self.require_bound_ledger(caller)?;
        token.validate()?;

        let selector = TokenSelector::Token(token.clone());
        let next = self.balance_for(&selector).checked_add(amount)?;
        self.set_balance(&selector, next);

        info!(token = %token, amount = amount.0, balance = next.0, "Vault received tokens");
        self.record(VaultReceipt::new(
            VaultOperation::Receive,
            selector,
            amount,
            caller.clone(),
        ));
        Ok(())
    }

    // --- Outbound ---

    /// Routine payment directed by the bound ledger
    pub fn disburse(
        &mut self,
        caller: &AccountRef,
        token: &TokenSelector,
        destination: &AccountRef,
        amount: Amount,
        sink: &mut dyn ValueSink,
    ) -> PledgeResult<()> {
        self.require_bound_ledger(caller)?;
        destination.validate()?;

        self.transfer_out(token, destination, amount, sink)?;

        info!(
            token = %token,
            destination = %destination,
            amount = amount.0,
            "Vault disbursed funds"
        );
        self.record(
            VaultReceipt::new(VaultOperation::Disburse, token.clone(), amount, caller.clone())
                .with_counterparty(destination.clone()),
        );
        Ok(())
    }

    /// Emergency withdrawal to the fixed escape hatch destination.
    ///
    /// Only the escape hatch caller may invoke this; the owner and the bound
    /// ledger cannot. Works whether or not a ledger is bound.
    pub fn escape_funds(
        &mut self,
        caller: &AccountRef,
        token: &TokenSelector,
        amount: Amount,
        sink: &mut dyn ValueSink,
    ) -> PledgeResult<()> {
        self.require_escape_hatch_caller(caller)?;

        let destination = self.escape_hatch_destination.clone();
        self.transfer_out(token, &destination, amount, sink)?;

        warn!(
            token = %token,
            destination = %destination,
            amount = amount.0,
            remaining = self.balance_for(token).0,
            "Escape hatch used"
        );
        self.record(
            VaultReceipt::new(VaultOperation::Escape, token.clone(), amount, caller.clone())
                .with_counterparty(destination),
        );
        Ok(())
    }

    /// Debit, then pay. The debit is restored if the sink rejects the payment.
    fn transfer_out(
        &mut self,
        token: &TokenSelector,
        destination: &AccountRef,
        amount: Amount,
        sink: &mut dyn ValueSink,
    ) -> PledgeResult<()> {
        let before = self.balance_for(token);
        let after = before.checked_sub(amount)?;
        self.set_balance(token, after);

        if let Err(err) = sink.pay(destination, token, amount) {
            self.set_balance(token, before);
            warn!(
                token = %token,
                destination = %destination,
                amount = amount.0,
                error = %err,
                "Transfer rejected; vault balance restored"
            );
            return Err(err);
        }
        Ok(())
    }

    fn record(&mut self, receipt: VaultReceipt) {
        self.receipts.push(receipt);
        if self.receipts.len() > RECEIPT_HISTORY {
            let excess = self.receipts.len() - RECEIPT_HISTORY;
            self.receipts.drain(..excess);
        }
    }

    fn balance_for(&self, token: &TokenSelector) -> Amount {
        match token {
            TokenSelector::Native => self.balance,
            TokenSelector::Token(t) => self.token_balances.get(t).copied().unwrap_or_default(),
        }
    }

    fn set_balance(&mut self, token: &TokenSelector, amount: Amount) {
        match token {
            TokenSelector::Native => self.balance = amount,
            TokenSelector::Token(t) => {
                self.token_balances.insert(t.clone(), amount);
            }
        }
    }

    // --- Query methods ---

    pub fn balance_of(&self) -> Amount {
        self.balance
    }

    pub fn token_balance_of(&self, token: &TokenSelector) -> Amount {
        self.balance_for(token)
    }

    pub fn owner(&self) -> &AccountRef {
        &self.owner
    }

    pub fn escape_hatch_caller(&self) -> &AccountRef {
        &self.escape_hatch_caller
    }

    pub fn escape_hatch_destination(&self) -> &AccountRef {
        &self.escape_hatch_destination
    }

    pub fn binding(&self) -> &LedgerBinding {
        &self.binding
    }

    pub fn bound_ledger(&self) -> Option<&AccountRef> {
        self.binding.ledger()
    }

    pub fn receipts(&self) -> &[VaultReceipt] {
        &self.receipts
    }

    pub fn deployed_at(&self) -> DateTime<Utc> {
        self.deployed_at
    }
}
