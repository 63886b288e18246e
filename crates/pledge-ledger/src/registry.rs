//! Admin Registry: sequential identity assignment and lookup
//!
//! Administrators live in an append-only arena; an admin's id is its index
//! plus one. Mutations are split into `plan_*` (validate and build the
//! record) and `commit` (make it visible) so the coordinator can persist
//! between the two.

use pledge_types::{
    AccountRef, AdminId, AdminKind, AdminUpdate, Administrator, PledgeError, PledgeResult,
};

/// Append-only registry of administrators
#[derive(Clone, Debug, Default)]
pub struct AdminRegistry {
    admins: Vec<Administrator>,
}

impl AdminRegistry {
    pub fn new() -> Self {
        Self { admins: Vec::new() }
    }

    /// Rebuild from persisted records; ids must run 1..=n without gaps
    pub fn from_admins(admins: Vec<Administrator>) -> PledgeResult<Self> {
        for (index, admin) in admins.iter().enumerate() {
            let expected = index as u64 + 1;
            if admin.id.0 != expected {
                return Err(PledgeError::Corrupted(format!(
                    "admin id gap at position {} (found {})",
                    expected, admin.id
                )));
            }
        }
        Ok(Self { admins })
    }

    /// Number of administrators ever created
    pub fn count(&self) -> u64 {
        self.admins.len() as u64
    }

    pub fn resolve(&self, id: AdminId) -> PledgeResult<&Administrator> {
        if id.is_none() {
            return Err(PledgeError::UnknownAdmin(id.0));
        }
        self.admins
            .get((id.0 - 1) as usize)
            .ok_or(PledgeError::UnknownAdmin(id.0))
    }

    pub fn exists(&self, id: AdminId) -> bool {
        self.resolve(id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Administrator> {
        self.admins.iter()
    }

    fn next_id(&self) -> AdminId {
        AdminId::new(self.count() + 1)
    }

    // --- Planning ---

    pub fn plan_giver(
        &self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
        commit_time: u64,
    ) -> PledgeResult<Administrator> {
        addr.validate()?;
        Ok(
            Administrator::new(self.next_id(), AdminKind::Giver, addr, name, url)
                .with_commit_time(commit_time),
        )
    }

    pub fn plan_delegate(
        &self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
        commit_time: u64,
    ) -> PledgeResult<Administrator> {
        addr.validate()?;
        Ok(
            Administrator::new(self.next_id(), AdminKind::Delegate, addr, name, url)
                .with_commit_time(commit_time),
        )
    }

    /// `parent` of `None` or 0 makes a root project
    pub fn plan_project(
        &self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
        parent: Option<AdminId>,
        commit_time: u64,
    ) -> PledgeResult<Administrator> {
        addr.validate()?;
        let parent = parent.filter(|p| !p.is_none());
        if let Some(parent) = parent {
            if !self.exists(parent) {
                return Err(PledgeError::InvalidParent(parent.0));
            }
        }
        Ok(
            Administrator::new(self.next_id(), AdminKind::Project, addr, name, url)
                .with_parent(parent)
                .with_commit_time(commit_time),
        )
    }

    /// Only the admin's own `addr` may change its metadata
    pub fn plan_update(
        &self,
        caller: &AccountRef,
        id: AdminId,
        update: &AdminUpdate,
    ) -> PledgeResult<Administrator> {
        let current = self.resolve(id)?;
        if !current.is_controlled_by(caller) {
            return Err(PledgeError::unauthorized("admin address", caller));
        }
        let mut updated = current.clone();
        updated.apply(update);
        Ok(updated)
    }

    // --- Committing ---

    /// Append a planned admin. Its id must be the next in sequence.
    pub fn commit(&mut self, admin: Administrator) -> PledgeResult<AdminId> {
        let expected = self.next_id();
        if admin.id != expected {
            return Err(PledgeError::Corrupted(format!(
                "admin commit out of sequence: expected {}, got {}",
                expected, admin.id
            )));
        }
        let id = admin.id;
        self.admins.push(admin);
        Ok(id)
    }

    /// Replace an existing admin's record with a planned update
    pub fn replace(&mut self, admin: Administrator) -> PledgeResult<()> {
        let slot = admin
            .id
            .0
            .checked_sub(1)
            .and_then(|index| self.admins.get_mut(index as usize))
            .ok_or(PledgeError::UnknownAdmin(admin.id.0))?;
        if slot.kind != admin.kind || slot.addr != admin.addr || slot.parent != admin.parent {
            return Err(PledgeError::Corrupted(format!(
                "admin {} identity fields are immutable",
                admin.id
            )));
        }
        *slot = admin;
        Ok(())
    }

    // --- Convenience (plan + commit) ---

    pub fn add_giver(
        &mut self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> PledgeResult<AdminId> {
        let admin = self.plan_giver(addr, name, url, 0)?;
        self.commit(admin)
    }

    pub fn add_delegate(
        &mut self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> PledgeResult<AdminId> {
        let admin = self.plan_delegate(addr, name, url, 0)?;
        self.commit(admin)
    }

    pub fn add_project(
        &mut self,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
        parent: Option<AdminId>,
    ) -> PledgeResult<AdminId> {
        let admin = self.plan_project(addr, name, url, parent, 0)?;
        self.commit(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequential_ids() {
        let mut registry = AdminRegistry::new();
        let giver = registry
            .add_giver(AccountRef::new("giver1"), "Giver1", "")
            .unwrap();
        let project = registry
            .add_project(AccountRef::new("project1"), "Project1", "", None)
            .unwrap();
        let delegate = registry
            .add_delegate(AccountRef::new("delegate1"), "Delegate1", "")
            .unwrap();

        assert_eq!(giver, AdminId::new(1));
        assert_eq!(project, AdminId::new(2));
        assert_eq!(delegate, AdminId::new(3));
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.resolve(project).unwrap().kind, AdminKind::Project);
        assert_eq!(registry.resolve(delegate).unwrap().kind, AdminKind::Delegate);
    }

    #[test]
    fn test_same_address_twice_creates_two_admins() {
        let mut registry = AdminRegistry::new();
        let addr = AccountRef::new("giver1");
        let first = registry.add_giver(addr.clone(), "A", "").unwrap();
        let second = registry.add_giver(addr, "B", "").unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_resolve_bounds() {
        let mut registry = AdminRegistry::new();
        registry
            .add_giver(AccountRef::new("giver1"), "Giver1", "")
            .unwrap();

        assert!(matches!(
            registry.resolve(AdminId::new(0)),
            Err(PledgeError::UnknownAdmin(0))
        ));
        assert!(matches!(
            registry.resolve(AdminId::new(2)),
            Err(PledgeError::UnknownAdmin(2))
        ));
    }

    #[test]
    fn test_project_parent() {
        let mut registry = AdminRegistry::new();
        let giver = registry
            .add_giver(AccountRef::new("giver1"), "Giver1", "")
            .unwrap();

        let child = registry
            .add_project(AccountRef::new("p"), "Child", "", Some(giver))
            .unwrap();
        assert_eq!(registry.resolve(child).unwrap().parent, Some(giver));

        // Zero parent means root
        let root = registry
            .add_project(AccountRef::new("p"), "Root", "", Some(AdminId::new(0)))
            .unwrap();
        assert_eq!(registry.resolve(root).unwrap().parent, None);

        let result = registry.add_project(AccountRef::new("p"), "Orphan", "", Some(AdminId::new(9)));
        assert!(matches!(result, Err(PledgeError::InvalidParent(9))));
        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn test_blank_address_rejected() {
        let mut registry = AdminRegistry::new();
        let result = registry.add_giver(AccountRef::new(""), "Nobody", "");
        assert!(matches!(result, Err(PledgeError::InvalidAddress(_))));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_update_only_by_admin_address() {
        let mut registry = AdminRegistry::new();
        let giver_addr = AccountRef::new("giver1");
        let id = registry.add_giver(giver_addr.clone(), "Giver1", "").unwrap();

        let update = AdminUpdate::new().name("Renamed");
        let result = registry.plan_update(&AccountRef::new("mallory"), id, &update);
        assert!(matches!(result, Err(PledgeError::Unauthorized { .. })));

        let planned = registry.plan_update(&giver_addr, id, &update).unwrap();
        registry.replace(planned).unwrap();
        assert_eq!(registry.resolve(id).unwrap().name, "Renamed");
    }

    #[test]
    fn test_plan_does_not_mint() {
        let registry = AdminRegistry::new();
        let planned = registry
            .plan_giver(AccountRef::new("giver1"), "Giver1", "", 0)
            .unwrap();
        assert_eq!(planned.id, AdminId::new(1));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_from_admins_detects_gap() {
        let mut registry = AdminRegistry::new();
        registry.add_giver(AccountRef::new("a"), "A", "").unwrap();
        registry.add_giver(AccountRef::new("b"), "B", "").unwrap();

        let mut admins: Vec<Administrator> = registry.iter().cloned().collect();
        admins.remove(0);
        assert!(matches!(
            AdminRegistry::from_admins(admins),
            Err(PledgeError::Corrupted(_))
        ));
    }

    proptest! {
        #[test]
        fn property_ids_strictly_increase_from_one(kinds in proptest::collection::vec(0u8..3, 0..40)) {
            let mut registry = AdminRegistry::new();
            let mut last = 0u64;

            for (calls, kind) in kinds.iter().enumerate() {
                let addr = AccountRef::new(format!("addr-{}", calls));
                let id = match kind {
                    0 => registry.add_giver(addr, "g", "").unwrap(),
                    1 => registry.add_delegate(addr, "d", "").unwrap(),
                    _ => registry.add_project(addr, "p", "", None).unwrap(),
                };
                prop_assert_eq!(id.0, last + 1);
                last = id.0;
                prop_assert_eq!(registry.count(), calls as u64 + 1);
            }
        }
    }
}
