//! Error types for the custody layer

use crate::AccountRef;

/// Errors that can occur in custody operations
#[derive(Debug, thiserror::Error)]
pub enum PledgeError {
    #[error("Unauthorized: {caller} does not hold the {role} role")]
    Unauthorized { role: String, caller: AccountRef },

    #[error("Unknown admin: {0}")]
    UnknownAdmin(u64),

    #[error("Invalid parent admin: {0}")]
    InvalidParent(u64),

    #[error("Unknown pledge: {0}")]
    UnknownPledge(u64),

    #[error("Vault has no bound ledger")]
    NotBound,

    #[error("Vault already bound to ledger {0}")]
    AlreadyBound(AccountRef),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Value mismatch: declared {declared}, attached {attached}")]
    ValueMismatch { declared: u64, attached: u64 },

    #[error("Invalid address: '{0}'")]
    InvalidAddress(String),

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted state: {0}")]
    Corrupted(String),
}

impl PledgeError {
    pub fn unauthorized(role: &str, caller: &AccountRef) -> Self {
        Self::Unauthorized {
            role: role.to_string(),
            caller: caller.clone(),
        }
    }
}

/// Result type alias for custody operations
pub type PledgeResult<T> = Result<T, PledgeError>;
