//! Accounts, amounts and call context

use crate::{PledgeError, PledgeResult};
use serde::{Deserialize, Serialize};

/// Opaque reference to an account able to sign calls or hold value
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountRef(pub String);

impl AccountRef {
    pub fn generate() -> Self {
        Self(format!("acct-{}", uuid::Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Reject blank identities
    pub fn validate(&self) -> PledgeResult<()> {
        if self.is_empty() {
            return Err(PledgeError::InvalidAddress(self.0.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative quantity of value in minor units
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Amount(pub u64);

impl Amount {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add, failing instead of wrapping
    pub fn checked_add(self, other: Self) -> PledgeResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(PledgeError::AmountOverflow)
    }

    /// Total of `amounts`, failing instead of wrapping
    pub fn checked_sum<I>(amounts: I) -> PledgeResult<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::zero(), |total, amount| total.checked_add(amount))
    }

    /// Subtract, failing when `other` exceeds `self`
    pub fn checked_sub(self, other: Self) -> PledgeResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(PledgeError::InsufficientBalance {
                required: other.0,
                available: self.0,
            })
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// Which asset an operation touches
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum TokenSelector {
    /// The native currency
    #[default]
    Native,
    /// A tracked token, identified by its contract account
    Token(AccountRef),
}

impl std::fmt::Display for TokenSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSelector::Native => write!(f, "native"),
            TokenSelector::Token(token) => write!(f, "token:{}", token),
        }
    }
}

/// Caller identity and value attached to a single call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: AccountRef,
    pub value: Amount,
}

impl CallContext {
    /// A call carrying no value
    pub fn new(caller: AccountRef) -> Self {
        Self {
            caller,
            value: Amount::zero(),
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_ref() {
        let generated = AccountRef::generate();
        assert!(generated.validate().is_ok());
        assert_eq!(format!("{}", AccountRef::new("0xabc")), "0xabc");

        let blank = AccountRef::new("  ");
        assert!(matches!(
            blank.validate(),
            Err(PledgeError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_amount_checked_ops() {
        let a = Amount::new(10_000);
        assert_eq!(a.checked_add(Amount::new(5)).unwrap(), Amount::new(10_005));
        assert_eq!(a.checked_sub(Amount::new(1_000)).unwrap(), Amount::new(9_000));

        let err = a.checked_sub(Amount::new(11_000)).unwrap_err();
        assert!(matches!(
            err,
            PledgeError::InsufficientBalance {
                required: 11_000,
                available: 10_000
            }
        ));

        assert!(matches!(
            Amount::new(u64::MAX).checked_add(Amount::new(1)),
            Err(PledgeError::AmountOverflow)
        ));
    }

    #[test]
    fn test_amount_checked_sum() {
        let total = Amount::checked_sum([Amount::new(1), Amount::new(2), Amount::new(3)]).unwrap();
        assert_eq!(total, Amount::new(6));
        assert_eq!(Amount::checked_sum([]).unwrap(), Amount::zero());

        let overflow = Amount::checked_sum([Amount::new(u64::MAX), Amount::new(1)]);
        assert!(matches!(overflow, Err(PledgeError::AmountOverflow)));
    }

    #[test]
    fn test_call_context() {
        let ctx = CallContext::new(AccountRef::new("giver")).with_value(Amount::new(42));
        assert_eq!(ctx.caller, AccountRef::new("giver"));
        assert_eq!(ctx.value, Amount::new(42));
    }

    #[test]
    fn test_token_selector_display() {
        assert_eq!(TokenSelector::Native.to_string(), "native");
        assert_eq!(
            TokenSelector::Token(AccountRef::new("dai")).to_string(),
            "token:dai"
        );
    }
}
