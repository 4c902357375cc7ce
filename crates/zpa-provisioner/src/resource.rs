use serde::Serialize;
use serde::de::DeserializeOwned;
use zpa_client::BoxFuture;

use crate::error::ProvisionerError;

/// Result of refreshing a resource from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<S> {
    Present(S),
    /// The entity no longer exists; the engine should drop it from state.
    Removed,
}

impl<S> ReadOutcome<S> {
    pub fn present(self) -> Option<S> {
        match self {
            Self::Present(s) => Some(s),
            Self::Removed => None,
        }
    }
}

/// Trait implemented by each resource type the engine manages.
///
/// The engine supplies plan and state snapshots of `Self::State` and persists
/// whatever state comes back. State returned from create and update is always
/// derived from a read-back, overlaid with the plan fields the server does
/// not echo.
///
/// Methods return boxed futures for dyn compatibility.
pub trait ManagedResource: Send + Sync {
    type State: Clone + Serialize + DeserializeOwned + Send + Sync;

    /// Resource type name (e.g. "zpa_application_segment_pra").
    fn type_name(&self) -> &'static str;

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>>;

    /// A missing entity is [`ReadOutcome::Removed`], not an error.
    fn read<'a>(
        &'a self,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<ReadOutcome<Self::State>, ProvisionerError>>;

    /// A missing entity is an error here: there is nothing to update.
    fn update<'a>(
        &'a self,
        plan: &'a Self::State,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>>;

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>>;

    /// Populate state from an external identifier (an id, or a name where
    /// the type supports it).
    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>>;
}
