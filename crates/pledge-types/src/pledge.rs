//! Pledge records: value earmarked for an administrator

use crate::{AdminId, Amount, PledgeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequential pledge identifier; 0 is the unattributed pool
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct PledgeId(pub u64);

impl PledgeId {
    /// Raw donations with no prior provenance
    pub const UNATTRIBUTED: PledgeId = PledgeId(0);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn is_unattributed(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PledgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a pledge: who owns it and where it came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PledgeKey {
    pub owner: AdminId,
    pub origin: PledgeId,
}

impl PledgeKey {
    pub fn new(owner: AdminId, origin: PledgeId) -> Self {
        Self { owner, origin }
    }
}

/// Value attributed to an administrator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pledge {
    pub id: PledgeId,
    pub amount: Amount,
    /// Admin currently entitled to the funds
    pub owner: AdminId,
    /// Originating pledge
    pub origin: PledgeId,
    pub updated_at: DateTime<Utc>,
}

impl Pledge {
    pub fn new(id: PledgeId, key: PledgeKey) -> Self {
        Self {
            id,
            amount: Amount::zero(),
            owner: key.owner,
            origin: key.origin,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> PledgeKey {
        PledgeKey::new(self.owner, self.origin)
    }

    /// Credit the pledge
    pub fn credit(&mut self, amount: Amount) -> PledgeResult<()> {
        self.amount = self.amount.checked_add(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Debit the pledge (returns error if insufficient)
    pub fn debit(&mut self, amount: Amount) -> PledgeResult<()> {
        self.amount = self.amount.checked_sub(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PledgeError;

    #[test]
    fn test_pledge_credit_debit() {
        let key = PledgeKey::new(AdminId::new(2), PledgeId::UNATTRIBUTED);
        let mut pledge = Pledge::new(PledgeId::new(1), key);
        assert_eq!(pledge.key(), key);

        pledge.credit(Amount::new(10_000)).unwrap();
        pledge.debit(Amount::new(4_000)).unwrap();
        assert_eq!(pledge.amount, Amount::new(6_000));

        // Over-debit fails
        let result = pledge.debit(Amount::new(7_000));
        assert!(matches!(
            result,
            Err(PledgeError::InsufficientBalance { .. })
        ));
        assert_eq!(pledge.amount, Amount::new(6_000)); // Unchanged
    }

    #[test]
    fn test_unattributed_pledge_id() {
        assert!(PledgeId::UNATTRIBUTED.is_unattributed());
        assert!(!PledgeId::new(3).is_unattributed());
    }
}
