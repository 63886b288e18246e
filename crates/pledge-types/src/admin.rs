//! Administrator types: the parties with standing in the ledger

use crate::AccountRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequential administrator identifier (first admin is 1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdminId(pub u64);

impl AdminId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Zero is never assigned
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for AdminId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role an administrator plays in pledge flows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminKind {
    /// Source of donations
    Giver,
    /// Intermediary that may redirect pledges
    Delegate,
    /// Recipient of funds
    Project,
}

impl std::fmt::Display for AdminKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AdminKind::Giver => "giver",
            AdminKind::Delegate => "delegate",
            AdminKind::Project => "project",
        };
        write!(f, "{}", label)
    }
}

/// A registered party
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
    /// Immutable sequential id
    pub id: AdminId,
    pub kind: AdminKind,
    /// Identity allowed to act for this admin
    pub addr: AccountRef,
    pub name: String,
    pub url: String,
    /// Vesting window carried for delegation logic; not interpreted here
    pub commit_time: u64,
    /// Containing admin; `None` for root-level admins
    pub parent: Option<AdminId>,
    pub created_at: DateTime<Utc>,
}

impl Administrator {
    pub fn new(
        id: AdminId,
        kind: AdminKind,
        addr: AccountRef,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            addr,
            name: name.into(),
            url: url.into(),
            commit_time: 0,
            parent: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_commit_time(mut self, commit_time: u64) -> Self {
        self.commit_time = commit_time;
        self
    }

    pub fn with_parent(mut self, parent: Option<AdminId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn is_controlled_by(&self, account: &AccountRef) -> bool {
        &self.addr == account
    }

    /// Apply mutable metadata; identity fields are untouched
    pub fn apply(&mut self, update: &AdminUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(url) = &update.url {
            self.url = url.clone();
        }
        if let Some(commit_time) = update.commit_time {
            self.commit_time = commit_time;
        }
    }
}

/// Metadata changes an admin may make to itself
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub commit_time: Option<u64>,
}

impl AdminUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn commit_time(mut self, commit_time: u64) -> Self {
        self.commit_time = Some(commit_time);
        self
    }
}
