use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::models::{SegmentGroup, SegmentGroupApplication};

use super::{lookup_for_import, non_empty, not_found_as, scoped, state_id};
use crate::config::ProviderConfig;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::prune::{PruneFailurePolicy, Pruner, ReferenceKind};
use crate::resource::{ManagedResource, ReadOutcome};

const KIND: &str = "segment group";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentGroupState {
    pub id: Attr<String>,
    pub name: String,
    pub description: Attr<String>,
    pub enabled: bool,
    pub microtenant_id: Attr<String>,
}

impl SegmentGroupState {
    /// Applications are attached from the segment side, so an update sends
    /// back the membership the server already has.
    fn expand(&self, applications: Vec<SegmentGroupApplication>) -> SegmentGroup {
        SegmentGroup {
            id: self.id.trimmed().unwrap_or_default().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trimmed().unwrap_or_default().to_string(),
            enabled: self.enabled,
            applications,
            microtenant_id: self.microtenant_id.trimmed().map(str::to_string),
        }
    }

    fn flatten(remote: SegmentGroup, prior: &Attr<String>) -> Self {
        Self {
            id: non_empty(&remote.id),
            name: remote.name,
            description: non_empty(&remote.description),
            enabled: remote.enabled,
            microtenant_id: remote
                .microtenant_id
                .map_or_else(|| prior.clone(), |id| non_empty(&id)),
        }
    }
}

pub struct SegmentGroupResource {
    service: Service,
    prune_failure_policy: PruneFailurePolicy,
}

impl SegmentGroupResource {
    pub fn new(service: Service, config: &ProviderConfig) -> Self {
        Self {
            service,
            prune_failure_policy: config.prune_failure_policy,
        }
    }
}

impl ManagedResource for SegmentGroupResource {
    type State = SegmentGroupState;

    fn type_name(&self) -> &'static str {
        "zpa_segment_group"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let service = scoped(&self.service, &plan.microtenant_id);
            let created = service
                .create(&plan.expand(Vec::new()))
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, &plan.name))?;
            tracing::info!(entity_id = %created.id, name = %created.name, "created segment group");

            let remote: SegmentGroup = service
                .get(&created.id)
                .await
                .map_err(not_found_as(KIND, &created.id))?;
            Ok(SegmentGroupState::flatten(remote, &plan.microtenant_id))
        })
    }

    fn read<'a>(
        &'a self,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<ReadOutcome<Self::State>, ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);
            match service.get::<SegmentGroup>(id).await {
                Ok(remote) => Ok(ReadOutcome::Present(SegmentGroupState::flatten(
                    remote,
                    &state.microtenant_id,
                ))),
                Err(e) if e.is_not_found() => Ok(ReadOutcome::Removed),
                Err(e) => Err(ProvisionerError::from(e).with_resource(KIND, id)),
            }
        })
    }

    fn update<'a>(
        &'a self,
        plan: &'a Self::State,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &plan.microtenant_id);

            let existing: SegmentGroup = service.get(id).await.map_err(not_found_as(KIND, id))?;
            let mut payload = plan.expand(existing.applications);
            payload.id = id.to_string();
            service
                .update(id, &payload)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, id))?;
            tracing::info!(entity_id = %id, "updated segment group");

            let remote: SegmentGroup = service.get(id).await.map_err(not_found_as(KIND, id))?;
            Ok(SegmentGroupState::flatten(remote, &plan.microtenant_id))
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);

            Pruner::new(service.clone())
                .with_failure_policy(self.prune_failure_policy)
                .prune(id, ReferenceKind::AppGroup)
                .await
                .map_err(|e| e.with_resource(KIND, id))?;

            match service.delete::<SegmentGroup>(id).await {
                Ok(()) => {
                    tracing::info!(entity_id = %id, "deleted segment group");
                    Ok(())
                }
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(ProvisionerError::from(e).with_resource(KIND, id)),
            }
        })
    }

    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let remote: SegmentGroup = lookup_for_import(&self.service, id).await?;
            Ok(SegmentGroupState::flatten(remote, &Attr::Null))
        })
    }
}
