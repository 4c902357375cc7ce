use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::models::{IdRef, PraConsole};

use super::{lookup_for_import, non_empty, not_found_as, scoped, state_id};
use crate::config::ProviderConfig;
use crate::diag::Diagnostics;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::prune::{PruneFailurePolicy, Pruner, ReferenceKind};
use crate::reconcile::order_like_plan;
use crate::resource::{ManagedResource, ReadOutcome};

const KIND: &str = "PRA console";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PraConsoleState {
    pub id: Attr<String>,
    pub name: String,
    pub description: Attr<String>,
    pub enabled: bool,
    /// Id of the PRA sub-app (`pra_app_id`) this console opens.
    pub pra_application_id: String,
    pub pra_portal_ids: Vec<String>,
    pub microtenant_id: Attr<String>,
}

impl PraConsoleState {
    fn expand(&self) -> Result<PraConsole, ProvisionerError> {
        let mut diags = Diagnostics::new();
        if self.name.trim().is_empty() {
            diags.error("Invalid configuration", "name must be provided");
        }
        if self.pra_application_id.trim().is_empty() {
            diags.error("Invalid configuration", "pra_application_id must be provided");
        }
        if self.pra_portal_ids.iter().all(|id| id.trim().is_empty()) {
            diags.error("Invalid configuration", "at least one pra_portal_id must be provided");
        }

        diags.into_result(PraConsole {
            id: self.id.trimmed().unwrap_or_default().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trimmed().unwrap_or_default().to_string(),
            enabled: self.enabled,
            pra_application: IdRef::new(self.pra_application_id.trim()),
            pra_portals: self
                .pra_portal_ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(IdRef::new)
                .collect(),
            microtenant_id: self.microtenant_id.trimmed().map(str::to_string),
        })
    }

    fn flatten(remote: PraConsole, prior: &PraConsoleState) -> Self {
        let portals = remote.pra_portals.into_iter().map(|p| p.id).collect();
        Self {
            id: non_empty(&remote.id),
            name: remote.name,
            description: non_empty(&remote.description),
            enabled: remote.enabled,
            pra_application_id: remote.pra_application.id,
            pra_portal_ids: order_like_plan(&prior.pra_portal_ids, portals, |id| id.as_str()),
            microtenant_id: remote
                .microtenant_id
                .map_or_else(|| prior.microtenant_id.clone(), |id| non_empty(&id)),
        }
    }
}

pub struct PraConsoleResource {
    service: Service,
    prune_failure_policy: PruneFailurePolicy,
}

impl PraConsoleResource {
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
        prior: &PraConsoleState,
    ) -> Result<PraConsoleState, ProvisionerError> {
        let remote: PraConsole = service.get(id).await.map_err(not_found_as(KIND, id))?;
        Ok(PraConsoleState::flatten(remote, prior))
    }
}

impl ManagedResource for PraConsoleResource {
    type State = PraConsoleState;

    fn type_name(&self) -> &'static str {
        "zpa_pra_console_controller"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let payload = plan.expand()?;
            let service = scoped(&self.service, &plan.microtenant_id);
            let created = service
                .create(&payload)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, &plan.name))?;
            tracing::info!(entity_id = %created.id, "created PRA console");
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
            let mut payload = plan.expand()?;
            payload.id = id.to_string();

            let service = scoped(&self.service, &plan.microtenant_id);
            service
                .update(id, &payload)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, id))?;
            tracing::info!(entity_id = %id, "updated PRA console");
            self.fetch(&service, id, plan).await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);

            Pruner::new(service.clone())
                .with_failure_policy(self.prune_failure_policy)
                .prune(id, ReferenceKind::Console)
                .await
                .map_err(|e| e.with_resource(KIND, id))?;

            match service.delete::<PraConsole>(id).await {
                Ok(()) => {
                    tracing::info!(entity_id = %id, "deleted PRA console");
                    Ok(())
                }
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(ProvisionerError::from(e).with_resource(KIND, id)),
            }
        })
    }

    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let remote: PraConsole = lookup_for_import(&self.service, id).await?;
            Ok(PraConsoleState::flatten(remote, &PraConsoleState::default()))
        })
    }
}
