use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::models::{ApplicationSegment, IdRef, ServerGroup};

use super::{lookup_for_import, non_empty, not_found_as, scoped, state_id};
use crate::config::ProviderConfig;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::prune::{PruneFailurePolicy, Pruner, ReferenceKind};
use crate::reconcile::order_like_plan;
use crate::resource::{ManagedResource, ReadOutcome};

const KIND: &str = "server group";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerGroupState {
    pub id: Attr<String>,
    pub name: String,
    pub description: Attr<String>,
    pub enabled: bool,
    pub dynamic_discovery: bool,
    pub app_connector_group_ids: Vec<String>,
    pub microtenant_id: Attr<String>,
}

impl ServerGroupState {
    fn expand(&self) -> ServerGroup {
        ServerGroup {
            id: self.id.trimmed().unwrap_or_default().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trimmed().unwrap_or_default().to_string(),
            enabled: self.enabled,
            dynamic_discovery: self.dynamic_discovery,
            app_connector_groups: self.app_connector_group_ids.iter().map(IdRef::new).collect(),
            applications: Vec::new(),
            microtenant_id: self.microtenant_id.trimmed().map(str::to_string),
        }
    }

    fn flatten(remote: ServerGroup, prior: &ServerGroupState) -> Self {
        let connector_groups = remote.app_connector_groups.into_iter().map(|g| g.id).collect();
        Self {
            id: non_empty(&remote.id),
            name: remote.name,
            description: non_empty(&remote.description),
            enabled: remote.enabled,
            dynamic_discovery: remote.dynamic_discovery,
            app_connector_group_ids: order_like_plan(
                &prior.app_connector_group_ids,
                connector_groups,
                |id| id.as_str(),
            ),
            microtenant_id: remote
                .microtenant_id
                .map_or_else(|| prior.microtenant_id.clone(), |id| non_empty(&id)),
        }
    }
}

pub struct ServerGroupResource {
    service: Service,
    prune_failure_policy: PruneFailurePolicy,
}

impl ServerGroupResource {
    pub fn new(service: Service, config: &ProviderConfig) -> Self {
        Self {
            service,
            prune_failure_policy: config.prune_failure_policy,
        }
    }

    async fn fetch(
        &self,
        service: &Service,
        id: &str,
        prior: &ServerGroupState,
    ) -> Result<ServerGroupState, ProvisionerError> {
        let remote: ServerGroup = service.get(id).await.map_err(not_found_as(KIND, id))?;
        Ok(ServerGroupState::flatten(remote, prior))
    }

    /// Drop the group from every application segment that lists it.
    /// Best-effort: failures are logged and the delete goes ahead.
    async fn detach_from_segments(&self, service: &Service, id: &str) {
        let segments = match service.list::<ApplicationSegment>().await {
            Ok(segments) => segments,
            Err(e) => {
                tracing::warn!(entity_id = %id, error = %e, "failed to list application segments");
                return;
            }
        };

        for mut segment in segments {
            let before = segment.server_groups.len();
            segment.server_groups.retain(|group| group.id != id);
            if segment.server_groups.len() == before {
                continue;
            }
            match service.update(&segment.id, &segment).await {
                Ok(()) => {
                    tracing::info!(
                        entity_id = %id,
                        segment_id = %segment.id,
                        "detached server group from application segment"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        entity_id = %id,
                        segment_id = %segment.id,
                        error = %e,
                        "failed to detach server group from application segment"
                    );
                }
            }
        }
    }
}

impl ManagedResource for ServerGroupResource {
    type State = ServerGroupState;

    fn type_name(&self) -> &'static str {
        "zpa_server_group"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let service = scoped(&self.service, &plan.microtenant_id);
            let created = service
                .create(&plan.expand())
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, &plan.name))?;
            tracing::info!(entity_id = %created.id, name = %created.name, "created server group");
            self.fetch(&service, &created.id, plan).await
        })
    }

    fn read<'a>(
        &'a self,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<ReadOutcome<Self::State>, ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);
            match self.fetch(&service, id, state).await {
                Ok(fresh) => Ok(ReadOutcome::Present(fresh)),
                Err(e) if e.is_not_found() => Ok(ReadOutcome::Removed),
                Err(e) => Err(e.with_resource(KIND, id)),
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

            // Applications attach from the segment side; keep what the server has.
            let existing: ServerGroup = service.get(id).await.map_err(not_found_as(KIND, id))?;
            let mut payload = plan.expand();
            payload.id = id.to_string();
            payload.applications = existing.applications;

            service
                .update(id, &payload)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, id))?;
            tracing::info!(entity_id = %id, "updated server group");
            self.fetch(&service, id, plan).await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);

            Pruner::new(service.clone())
                .with_failure_policy(self.prune_failure_policy)
                .prune(id, ReferenceKind::ServerGroup)
                .await
                .map_err(|e| e.with_resource(KIND, id))?;
            self.detach_from_segments(&service, id).await;

            match service.delete::<ServerGroup>(id).await {
                Ok(()) => {
                    tracing::info!(entity_id = %id, "deleted server group");
                    Ok(())
                }
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(ProvisionerError::from(e).with_resource(KIND, id)),
            }
        })
    }

    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let remote: ServerGroup = lookup_for_import(&self.service, id).await?;
            Ok(ServerGroupState::flatten(remote, &ServerGroupState::default()))
        })
    }
}
