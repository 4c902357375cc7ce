//! zpa-provisioner
//!
//! Resource layer of a declarative ZPA provider. The engine hands each
//! resource a plan or a state snapshot; resources translate it into
//! management API calls and hand back the state to persist.
//!
//! Shared building blocks:
//! - `resolve_identity()`: id-or-name reference resolution
//! - `reconcile()`: merge a planned nested list with the server's copy
//! - `Pruner`: remove back-references from policy rules before a delete
//! - `create_or_adopt()`: create a singleton, or adopt the existing one

pub mod config;
pub mod diag;
pub mod error;
pub mod plan;
pub mod prune;
pub mod reconcile;
pub mod resolve;
pub mod resource;
pub mod resources;
pub mod upsert;

pub use crate::config::ProviderConfig;
pub use crate::diag::{Diagnostic, Diagnostics, Severity};
pub use crate::error::ProvisionerError;
pub use crate::plan::Attr;
pub use crate::prune::{LockRegistry, PruneFailurePolicy, PruneReport, Pruner, ReferenceKind};
pub use crate::reconcile::{DuplicateKeys, Reconciled, reconcile};
pub use crate::resolve::{Resolved, resolve_identity};
pub use crate::resource::{ManagedResource, ReadOutcome};
pub use crate::upsert::{Singleton, Upserted, create_or_adopt};
