//! zpa-core
//!
//! Pure domain types and management API path conventions.
//! No transport dependency; this is the shared vocabulary of the ZPA
//! provisioning crates.

pub mod entity;
pub mod error;
pub mod models;
pub mod paths;
pub mod scope;

pub use crate::entity::{Collection, Entity, PolicyType};
pub use crate::error::CoreError;
pub use crate::scope::Scope;
