//! Liquid Pledge Domain Types
//!
//! Shared vocabulary for the custody workspace: who can act
//! (`AccountRef`), what they act on (`Amount`, `TokenSelector`), the parties
//! with standing (`Administrator`) and the records that say whose money is
//! whose (`Pledge`).
//!
//! # Key Concepts
//!
//! - **Administrator**: a Giver, Delegate or Project with a sequential id.
//! - **Pledge**: value earmarked for an administrator, with provenance.
//! - **CallContext**: the implicit caller identity and attached value of a
//!   single operation.
//!
//! # Architecture
//!
//! Pure types crate. IDs use the newtype pattern and implement `Display`.
//! All errors across the workspace funnel into [`PledgeError`].

#![deny(unsafe_code)]

mod account;
mod admin;
mod errors;
mod pledge;

pub use account::*;
pub use admin::*;
pub use errors::*;
pub use pledge::*;
