//! `zpa_application_segment_weightedlb_config`
//!
//! Weighted load balancing hangs off an application segment and has no id of
//! its own; the state id is the application id.

use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::models::{ApplicationSegment, ServerGroup, ServerGroupMapping, WeightedLbConfig};

use super::{non_empty, scoped};
use crate::diag::Diagnostics;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::reconcile::order_like_plan;
use crate::resolve::resolve_entity;
use crate::resource::{ManagedResource, ReadOutcome};

const KIND: &str = "weighted load balancer config";
const DEFAULT_WEIGHT: &str = "0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedLbConfigState {
    pub id: Attr<String>,
    pub application_id: Attr<String>,
    pub application_name: Attr<String>,
    pub weighted_load_balancing: bool,
    pub mappings: Vec<ServerGroupMappingState>,
    pub microtenant_id: Attr<String>,
}

/// One server group and its weight. Identified by id or by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerGroupMappingState {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub passive: bool,
    pub weight: Attr<String>,
}

impl WeightedLbConfigState {
    /// The application id from `id` or `application_id`, whichever is set.
    fn known_application_id(&self) -> Option<&str> {
        self.id.trimmed().or_else(|| self.application_id.trimmed())
    }
}

pub struct WeightedLbConfigResource {
    service: Service,
}

impl WeightedLbConfigResource {
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    /// Resolve every mapping to a server group id. Missing identifiers and
    /// unknown names are collected; transport failures abort.
    async fn expand_mappings(
        &self,
        service: &Service,
        mappings: &[ServerGroupMappingState],
    ) -> Result<Vec<ServerGroupMapping>, ProvisionerError> {
        let mut diags = Diagnostics::new();
        let mut out = Vec::with_capacity(mappings.len());

        for (idx, mapping) in mappings.iter().enumerate() {
            let resolved = resolve_entity::<ServerGroup>(
                service,
                mapping.id.trimmed(),
                mapping.name.trimmed(),
            )
            .await;
            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(ProvisionerError::MissingIdentifier { .. }) => {
                    diags.error(
                        "Missing server group identifier",
                        format!("mappings[{idx}] must include either id or name"),
                    );
                    continue;
                }
                Err(e @ ProvisionerError::LookupNotFound { .. }) => {
                    diags.error("Server group not found", format!("mappings[{idx}]: {e}"));
                    continue;
                }
                Err(e) => return Err(e),
            };

            out.push(ServerGroupMapping {
                id: resolved.id,
                name: resolved
                    .name
                    .or_else(|| mapping.name.trimmed().map(str::to_string))
                    .unwrap_or_default(),
                passive: mapping.passive,
                weight: mapping
                    .weight
                    .trimmed()
                    .unwrap_or(DEFAULT_WEIGHT)
                    .to_string(),
            });
        }

        diags.into_result(out)
    }

    async fn apply(
        &self,
        plan: &WeightedLbConfigState,
    ) -> Result<WeightedLbConfigState, ProvisionerError> {
        let service = scoped(&self.service, &plan.microtenant_id);

        let application = resolve_entity::<ApplicationSegment>(
            &service,
            plan.known_application_id(),
            plan.application_name.trimmed(),
        )
        .await?;

        let mappings = self.expand_mappings(&service, &plan.mappings).await?;
        let order: Vec<String> = mappings.iter().map(|m| m.id.clone()).collect();
        let config = WeightedLbConfig {
            application_id: application.id.clone(),
            weighted_load_balancing: plan.weighted_load_balancing,
            application_to_server_group_maps: mappings,
        };

        service
            .update_weighted_lb_config(&application.id, &config)
            .await
            .map_err(|e| ProvisionerError::from(e).with_resource(KIND, &application.id))?;
        tracing::info!(
            application_id = %application.id,
            mappings = config.application_to_server_group_maps.len(),
            "applied weighted load balancer config"
        );

        let mut state = self.fetch(&service, &application.id, &order).await?;
        state.microtenant_id = plan.microtenant_id.clone();
        let name = application
            .name
            .or_else(|| plan.application_name.trimmed().map(str::to_string));
        if let Some(name) = name {
            state.application_name = Attr::Known(name);
        }
        Ok(state)
    }

    /// Read back, ordering mappings like `order` (server group ids).
    async fn fetch(
        &self,
        service: &Service,
        application_id: &str,
        order: &[String],
    ) -> Result<WeightedLbConfigState, ProvisionerError> {
        let config = service
            .weighted_lb_config(application_id)
            .await
            .map_err(super::not_found_as(KIND, application_id))?;

        let mappings = config.application_to_server_group_maps;
        let mappings = order_like_plan(order, mappings, |m| m.id.as_str())
            .into_iter()
            .map(|m| ServerGroupMappingState {
                id: non_empty(&m.id),
                name: non_empty(&m.name),
                passive: m.passive,
                weight: non_empty(&m.weight),
            })
            .collect();

        // The name is cosmetic; only a missing application leaves it null.
        let application_name = match service.get::<ApplicationSegment>(application_id).await {
            Ok(app) => non_empty(&app.name),
            Err(e) if e.is_not_found() => Attr::Null,
            Err(e) => return Err(e.into()),
        };

        Ok(WeightedLbConfigState {
            id: Attr::Known(application_id.to_string()),
            application_id: Attr::Known(application_id.to_string()),
            application_name,
            weighted_load_balancing: config.weighted_load_balancing,
            mappings,
            microtenant_id: Attr::Null,
        })
    }
}

impl ManagedResource for WeightedLbConfigResource {
    type State = WeightedLbConfigState;

    fn type_name(&self) -> &'static str {
        "zpa_application_segment_weightedlb_config"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(self.apply(plan))
    }

    fn read<'a>(
        &'a self,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<ReadOutcome<Self::State>, ProvisionerError>> {
        Box::pin(async move {
            let Some(application_id) = state.known_application_id() else {
                return Err(ProvisionerError::MissingIdentifier {
                    kind: "application".to_string(),
                });
            };
            let service = scoped(&self.service, &state.microtenant_id);
            let order: Vec<String> = state
                .mappings
                .iter()
                .filter_map(|m| m.id.trimmed().map(str::to_string))
                .collect();

            match self.fetch(&service, application_id, &order).await {
                Ok(mut fresh) => {
                    fresh.microtenant_id = state.microtenant_id.clone();
                    if state.application_name.is_known() {
                        fresh.application_name = state.application_name.clone();
                    }
                    Ok(ReadOutcome::Present(fresh))
                }
                Err(e) if e.is_not_found() => Ok(ReadOutcome::Removed),
                Err(e) => Err(e),
            }
        })
    }

    fn update<'a>(
        &'a self,
        plan: &'a Self::State,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            // Keep addressing the same application when the plan only names it.
            let mut plan = plan.clone();
            if plan.known_application_id().is_none() {
                if let Some(id) = state.known_application_id() {
                    plan.application_id = Attr::Known(id.to_string());
                }
            }
            self.apply(&plan).await
        })
    }

    /// There is nothing to delete; weighted load balancing is switched off.
    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            let Some(application_id) = state.known_application_id() else {
                return Ok(());
            };
            let service = scoped(&self.service, &state.microtenant_id);
            let config = WeightedLbConfig {
                application_id: application_id.to_string(),
                weighted_load_balancing: false,
                application_to_server_group_maps: Vec::new(),
            };
            service
                .update_weighted_lb_config(application_id, &config)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, application_id))?;
            tracing::info!(application_id = %application_id, "disabled weighted load balancing");
            Ok(())
        })
    }

    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let id = id.trim();
            if id.is_empty() {
                let mut diags = Diagnostics::new();
                diags.error("Invalid import ID", "import requires the application segment id");
                return Err(ProvisionerError::Validation(diags));
            }
            let state = WeightedLbConfigState {
                id: Attr::Known(id.to_string()),
                application_id: Attr::Known(id.to_string()),
                ..WeightedLbConfigState::default()
            };
            match self.read(&state).await? {
                ReadOutcome::Present(imported) => Ok(imported),
                ReadOutcome::Removed => Err(ProvisionerError::NotFound {
                    kind: KIND.to_string(),
                    id: id.to_string(),
                }),
            }
        })
    }
}
