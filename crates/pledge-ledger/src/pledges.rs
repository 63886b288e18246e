//! Pledge bookkeeping: whose money this is

use pledge_types::{AdminId, Amount, Pledge, PledgeError, PledgeId, PledgeKey, PledgeResult};
use std::collections::HashMap;

/// Arena of pledges with a `(owner, origin)` index.
///
/// The running total of every pledge always fits in an [`Amount`]; a credit
/// that would push it past that is refused when planned.
#[derive(Clone, Debug, Default)]
pub struct PledgeBook {
    pledges: Vec<Pledge>,
    index: HashMap<PledgeKey, PledgeId>,
    total: Amount,
}

impl PledgeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records; ids must run 1..=n and keys be unique
    pub fn from_pledges(pledges: Vec<Pledge>) -> PledgeResult<Self> {
        let mut book = Self::new();
        for pledge in pledges {
            book.commit(pledge)?;
        }
        Ok(book)
    }

    pub fn count(&self) -> u64 {
        self.pledges.len() as u64
    }

    pub fn get(&self, id: PledgeId) -> PledgeResult<&Pledge> {
        if id.is_unattributed() {
            return Err(PledgeError::UnknownPledge(id.0));
        }
        self.pledges
            .get((id.0 - 1) as usize)
            .ok_or(PledgeError::UnknownPledge(id.0))
    }

    pub fn find(&self, key: PledgeKey) -> Option<&Pledge> {
        self.index.get(&key).and_then(|id| self.get(*id).ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pledge> {
        self.pledges.iter()
    }

    pub fn owned_by(&self, owner: AdminId) -> Vec<&Pledge> {
        self.pledges.iter().filter(|p| p.owner == owner).collect()
    }

    /// Sum of all pledged value
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Build the credited pledge for `key` without mutating the book
    pub fn plan_credit(&self, key: PledgeKey, amount: Amount) -> PledgeResult<Pledge> {
        self.total.checked_add(amount)?;
        let mut pledge = match self.find(key) {
            Some(existing) => existing.clone(),
            None => Pledge::new(PledgeId::new(self.count() + 1), key),
        };
        pledge.credit(amount)?;
        Ok(pledge)
    }

    /// Build the debited pledge without mutating the book
    pub fn plan_debit(&self, id: PledgeId, amount: Amount) -> PledgeResult<Pledge> {
        let mut pledge = self.get(id)?.clone();
        pledge.debit(amount)?;
        Ok(pledge)
    }

    /// Make a planned pledge visible: append the next id or replace in place
    pub fn commit(&mut self, pledge: Pledge) -> PledgeResult<()> {
        let next = self.count() + 1;
        if pledge.id.0 == next {
            if self.index.contains_key(&pledge.key()) {
                return Err(PledgeError::Corrupted(format!(
                    "duplicate pledge for owner {} origin {}",
                    pledge.owner, pledge.origin
                )));
            }
            self.total = self.total.checked_add(pledge.amount)?;
            self.index.insert(pledge.key(), pledge.id);
            self.pledges.push(pledge);
            return Ok(());
        }

        let slot = pledge
            .id
            .0
            .checked_sub(1)
            .and_then(|index| self.pledges.get_mut(index as usize))
            .ok_or_else(|| {
                PledgeError::Corrupted(format!(
                    "pledge commit out of sequence: expected at most {}, got {}",
                    next, pledge.id
                ))
            })?;
        if slot.key() != pledge.key() {
            return Err(PledgeError::Corrupted(format!(
                "pledge {} owner/origin are immutable",
                pledge.id
            )));
        }
        self.total = self
            .total
            .checked_sub(slot.amount)?
            .checked_add(pledge.amount)?;
        *slot = pledge;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(owner: u64, origin: u64) -> PledgeKey {
        PledgeKey::new(AdminId::new(owner), PledgeId::new(origin))
    }

    #[test]
    fn test_credit_creates_then_merges() {
        let mut book = PledgeBook::new();

        let first = book.plan_credit(key(2, 0), Amount::new(10_000)).unwrap();
        assert_eq!(first.id, PledgeId::new(1));
        book.commit(first).unwrap();

        let merged = book.plan_credit(key(2, 0), Amount::new(500)).unwrap();
        assert_eq!(merged.id, PledgeId::new(1));
        book.commit(merged).unwrap();

        assert_eq!(book.count(), 1);
        assert_eq!(book.get(PledgeId::new(1)).unwrap().amount, Amount::new(10_500));
    }

    #[test]
    fn test_distinct_origin_is_distinct_pledge() {
        let mut book = PledgeBook::new();
        book.commit(book.plan_credit(key(2, 0), Amount::new(100)).unwrap())
            .unwrap();
        book.commit(book.plan_credit(key(2, 1), Amount::new(50)).unwrap())
            .unwrap();

        assert_eq!(book.count(), 2);
        assert_eq!(book.owned_by(AdminId::new(2)).len(), 2);
        assert_eq!(book.total(), Amount::new(150));
    }

    #[test]
    fn test_plan_leaves_book_untouched() {
        let book = PledgeBook::new();
        let planned = book.plan_credit(key(1, 0), Amount::new(100)).unwrap();
        assert_eq!(planned.amount, Amount::new(100));
        assert_eq!(book.count(), 0);
        assert!(book.find(key(1, 0)).is_none());
    }

    #[test]
    fn test_debit_bounds() {
        let mut book = PledgeBook::new();
        book.commit(book.plan_credit(key(2, 0), Amount::new(100)).unwrap())
            .unwrap();

        let result = book.plan_debit(PledgeId::new(1), Amount::new(101));
        assert!(matches!(
            result,
            Err(PledgeError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            book.plan_debit(PledgeId::new(0), Amount::new(1)),
            Err(PledgeError::UnknownPledge(0))
        ));
    }

    #[test]
    fn test_recommit_previous_restores_total() {
        let mut book = PledgeBook::new();
        book.commit(book.plan_credit(key(2, 0), Amount::new(100)).unwrap())
            .unwrap();

        let previous = book.get(PledgeId::new(1)).unwrap().clone();
        book.commit(book.plan_debit(PledgeId::new(1), Amount::new(40)).unwrap())
            .unwrap();
        assert_eq!(book.total(), Amount::new(60));

        book.commit(previous).unwrap();
        assert_eq!(book.total(), Amount::new(100));
        assert_eq!(book.get(PledgeId::new(1)).unwrap().amount, Amount::new(100));
    }

    #[test]
    fn test_total_never_overflows_across_keys() {
        let mut book = PledgeBook::new();
        book.commit(book.plan_credit(key(2, 0), Amount::new(u64::MAX)).unwrap())
            .unwrap();

        let result = book.plan_credit(key(1, 0), Amount::new(1));
        assert!(matches!(result, Err(PledgeError::AmountOverflow)));
        assert_eq!(book.count(), 1);
        assert_eq!(book.total(), Amount::new(u64::MAX));
    }

    #[test]
    fn test_hydrating_overflowing_records_fails() {
        let mut first = Pledge::new(PledgeId::new(1), key(1, 0));
        first.credit(Amount::new(u64::MAX)).unwrap();
        let mut second = Pledge::new(PledgeId::new(2), key(2, 0));
        second.credit(Amount::new(1)).unwrap();

        assert!(matches!(
            PledgeBook::from_pledges(vec![first, second]),
            Err(PledgeError::AmountOverflow)
        ));
    }
}
