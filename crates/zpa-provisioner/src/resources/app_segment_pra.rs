//! `zpa_application_segment_pra`
//!
//! A PRA segment declares one sub-app per domain in `common_apps`. The server
//! assigns each sub-app an id (`pra_app_id`) and an application id
//! (`app_id`). Sub-apps are matched to server records by domain, and a
//! domain dropped from the plan is deleted in the same update request.

use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::PolicyType;
use zpa_core::models::app_segment_pra::DEFAULT_APP_TYPE;
use zpa_core::models::{AppSegmentPra, AppsConfig, CommonAppsDto, IdRef, PraApp, SegmentGroup};

use super::{lookup_for_import, non_empty, not_found_as, scoped, state_id};
use crate::config::ProviderConfig;
use crate::diag::Diagnostics;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::prune::{PruneFailurePolicy, Pruner, ReferenceKind};
use crate::reconcile::{
    DuplicateKeys, PlanRecord, RemoteRecord, natural_key, order_like_plan, overlay_identities,
    reconcile,
};
use crate::resource::{ManagedResource, ReadOutcome};

const KIND: &str = "PRA application segment";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSegmentPraState {
    pub id: Attr<String>,
    pub name: String,
    pub description: Attr<String>,
    pub enabled: bool,
    pub segment_group_id: String,
    pub domain_names: Vec<String>,
    pub tcp_port_ranges: Vec<String>,
    pub udp_port_ranges: Vec<String>,
    pub server_group_ids: Vec<String>,
    pub common_apps: Vec<CommonAppState>,
    pub microtenant_id: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonAppState {
    pub domain: String,
    pub name: Attr<String>,
    pub description: Attr<String>,
    pub enabled: bool,
    pub app_types: Vec<String>,
    pub application_port: Attr<String>,
    pub application_protocol: Attr<String>,
    pub connection_security: Attr<String>,
    /// Computed: server sub-app id.
    pub pra_app_id: Attr<String>,
    /// Computed: server application id.
    pub app_id: Attr<String>,
}

/// Fill a blank attribute from the server's value.
fn fill(attr: &mut Attr<String>, remote: &str) {
    if attr.trimmed().is_none() && !remote.trim().is_empty() {
        *attr = Attr::Known(remote.trim().to_string());
    }
}

impl RemoteRecord for PraApp {
    fn natural_key(&self) -> &str {
        &self.domain
    }

    fn sub_id(&self) -> &str {
        &self.id
    }
}

impl PlanRecord for CommonAppState {
    type Remote = PraApp;

    fn natural_key(&self) -> &str {
        &self.domain
    }

    fn absorb(&mut self, remote: &PraApp) {
        self.set_identity(Some(remote));
        fill(&mut self.name, &remote.name);
        fill(&mut self.description, &remote.description);
        fill(&mut self.application_port, &remote.application_port);
        fill(&mut self.application_protocol, &remote.application_protocol);
        fill(&mut self.connection_security, &remote.connection_security);
    }

    fn set_identity(&mut self, remote: Option<&PraApp>) {
        match remote {
            Some(app) => {
                self.pra_app_id = non_empty(&app.id);
                self.app_id = non_empty(&app.app_id);
            }
            None => {
                self.pra_app_id = Attr::Null;
                self.app_id = Attr::Null;
            }
        }
    }

    fn from_remote(app: &PraApp) -> Self {
        Self {
            domain: app.domain.clone(),
            name: non_empty(&app.name),
            description: non_empty(&app.description),
            enabled: app.enabled,
            app_types: vec![DEFAULT_APP_TYPE.to_string()],
            application_port: non_empty(&app.application_port),
            application_protocol: non_empty(&app.application_protocol),
            connection_security: non_empty(&app.connection_security),
            pra_app_id: non_empty(&app.id),
            app_id: non_empty(&app.app_id),
        }
    }

    /// Same domain and, when the state knows it, the same name.
    fn same_record(&self, remote: &PraApp) -> bool {
        natural_key(&self.domain) == natural_key(&remote.domain)
            && self
                .name
                .trimmed()
                .is_none_or(|name| name.eq_ignore_ascii_case(remote.name.trim()))
    }
}

impl CommonAppState {
    fn to_config(&self) -> AppsConfig {
        let text = |attr: &Attr<String>| attr.trimmed().unwrap_or_default().to_string();
        AppsConfig {
            app_id: text(&self.app_id),
            pra_app_id: text(&self.pra_app_id),
            name: text(&self.name),
            description: text(&self.description),
            enabled: self.enabled,
            app_types: if self.app_types.is_empty() {
                vec![DEFAULT_APP_TYPE.to_string()]
            } else {
                self.app_types.clone()
            },
            application_port: text(&self.application_port),
            application_protocol: text(&self.application_protocol),
            connection_security: text(&self.connection_security),
            domain: self.domain.trim().to_string(),
        }
    }
}

/// Plan checks that need no server state. Every problem is reported.
pub fn validate(plan: &AppSegmentPraState) -> Diagnostics {
    let mut diags = Diagnostics::new();

    if plan.name.trim().is_empty() {
        diags.error("Invalid configuration", "name must be provided");
    }
    if plan.segment_group_id.trim().is_empty() {
        diags.error("Invalid configuration", "segment_group_id must be provided");
    }

    let domains: Vec<String> = plan
        .domain_names
        .iter()
        .map(|d| natural_key(d))
        .filter(|d| !d.is_empty())
        .collect();

    for (i, app) in plan.common_apps.iter().enumerate() {
        let domain = app.domain.trim();
        if domain.is_empty() {
            diags.error(
                "Invalid configuration",
                format!("common_apps[{i}]: domain must be provided"),
            );
            continue;
        }
        if !domains.contains(&natural_key(domain)) {
            diags.error(
                "Invalid configuration",
                format!("common_apps[{i}]: domain {domain:?} is not defined in domain_names"),
            );
        }

        let protocol = app.application_protocol.trimmed().unwrap_or_default();
        let rdp = protocol.eq_ignore_ascii_case("RDP");
        match (rdp, app.connection_security.trimmed()) {
            (true, None) => diags.error(
                "Invalid configuration",
                format!(
                    "common_apps[{i}]: connection_security must be set when application_protocol is RDP"
                ),
            ),
            (false, Some(_)) => diags.error(
                "Invalid configuration",
                format!(
                    "common_apps[{i}]: connection_security can only be set when application_protocol is RDP"
                ),
            ),
            _ => {}
        }
    }

    diags
}

fn expand(
    plan: &AppSegmentPraState,
    apps: &[CommonAppState],
    deleted_pra_apps: Vec<String>,
    domain_names: Vec<String>,
) -> AppSegmentPra {
    AppSegmentPra {
        id: plan.id.trimmed().unwrap_or_default().to_string(),
        name: plan.name.trim().to_string(),
        description: plan.description.trimmed().unwrap_or_default().to_string(),
        enabled: plan.enabled,
        segment_group_id: plan.segment_group_id.trim().to_string(),
        segment_group_name: String::new(),
        domain_names,
        tcp_port_ranges: plan.tcp_port_ranges.clone(),
        udp_port_ranges: plan.udp_port_ranges.clone(),
        server_groups: plan.server_group_ids.iter().map(IdRef::new).collect(),
        common_apps_dto: Some(CommonAppsDto {
            apps_config: apps.iter().map(CommonAppState::to_config).collect(),
            deleted_pra_apps,
        }),
        pra_apps: Vec::new(),
        microtenant_id: plan.microtenant_id.trimmed().map(str::to_string),
    }
}

/// State from a server read-back, keeping the prior state's list order and
/// user-controlled sub-app fields.
fn flatten(remote: AppSegmentPra, prior: &AppSegmentPraState) -> AppSegmentPraState {
    let server_group_ids = remote.server_groups.into_iter().map(|g| g.id).collect();
    AppSegmentPraState {
        id: non_empty(&remote.id),
        name: remote.name,
        description: non_empty(&remote.description),
        enabled: remote.enabled,
        segment_group_id: remote.segment_group_id,
        domain_names: order_like_plan(&prior.domain_names, remote.domain_names, |d| d.as_str()),
        tcp_port_ranges: remote.tcp_port_ranges,
        udp_port_ranges: remote.udp_port_ranges,
        server_group_ids: order_like_plan(&prior.server_group_ids, server_group_ids, |id| {
            id.as_str()
        }),
        common_apps: overlay_identities(&prior.common_apps, &remote.pra_apps),
        microtenant_id: remote
            .microtenant_id
            .map_or_else(|| prior.microtenant_id.clone(), |id| non_empty(&id)),
    }
}

pub struct AppSegmentPraResource {
    service: Service,
    duplicate_keys: DuplicateKeys,
    prune_failure_policy: PruneFailurePolicy,
    detach_policy_types: Vec<PolicyType>,
}

impl AppSegmentPraResource {
    pub fn new(service: Service, config: &ProviderConfig) -> Self {
        Self {
            service,
            duplicate_keys: config.duplicate_keys,
            prune_failure_policy: config.prune_failure_policy,
            detach_policy_types: config.app_detach_policy_types.clone(),
        }
    }

    async fn read_back(
        &self,
        service: &Service,
        id: &str,
        prior: &AppSegmentPraState,
    ) -> Result<AppSegmentPraState, ProvisionerError> {
        let remote: AppSegmentPra = service.get(id).await.map_err(not_found_as(KIND, id))?;
        Ok(flatten(remote, prior))
    }

    /// Remove the segment from its segment group's application list.
    async fn detach_from_segment_group(
        &self,
        service: &Service,
        id: &str,
        group_id: &str,
    ) -> Result<(), ProvisionerError> {
        let mut group: SegmentGroup = match service.get(group_id).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let before = group.applications.len();
        group.applications.retain(|app| app.id != id);
        if group.applications.len() == before {
            return Ok(());
        }

        service.update(group_id, &group).await?;
        tracing::info!(
            entity_id = %id,
            segment_group_id = %group_id,
            "detached from segment group"
        );
        Ok(())
    }

    async fn create_inner(
        &self,
        plan: &AppSegmentPraState,
    ) -> Result<AppSegmentPraState, ProvisionerError> {
        validate(plan).into_result(())?;
        let service = scoped(&self.service, &plan.microtenant_id);

        let reconciled =
            reconcile(&plan.common_apps, &[], &plan.domain_names, self.duplicate_keys)?;
        let payload = expand(plan, &reconciled.records, Vec::new(), reconciled.parent_keys);

        let created = service.create(&payload).await?;
        tracing::info!(
            entity_id = %created.id,
            apps = reconciled.records.len(),
            "created PRA application segment"
        );

        let mut prior = plan.clone();
        prior.common_apps = reconciled.records;
        self.read_back(&service, &created.id, &prior).await
    }

    async fn update_inner(
        &self,
        plan: &AppSegmentPraState,
        state: &AppSegmentPraState,
    ) -> Result<AppSegmentPraState, ProvisionerError> {
        validate(plan).into_result(())?;
        let id = state_id(KIND, &state.id)?;
        let service = scoped(&self.service, &plan.microtenant_id);

        let existing: AppSegmentPra = service.get(id).await.map_err(not_found_as(KIND, id))?;
        let reconciled = reconcile(
            &plan.common_apps,
            &existing.pra_apps,
            &plan.domain_names,
            self.duplicate_keys,
        )?;

        let mut payload = expand(
            plan,
            &reconciled.records,
            reconciled.to_delete.clone(),
            reconciled.parent_keys.clone(),
        );
        payload.id = id.to_string();
        service.update(id, &payload).await?;
        tracing::info!(
            entity_id = %id,
            apps = reconciled.records.len(),
            deleted = reconciled.to_delete.len(),
            "updated PRA application segment"
        );

        let mut prior = plan.clone();
        prior.domain_names = reconciled.parent_keys;
        prior.common_apps = reconciled.records;
        self.read_back(&service, id, &prior).await
    }

    async fn delete_inner(&self, state: &AppSegmentPraState) -> Result<(), ProvisionerError> {
        let id = state_id(KIND, &state.id)?;
        let service = scoped(&self.service, &state.microtenant_id);

        let group_id = state.segment_group_id.trim();
        if !group_id.is_empty() {
            self.detach_from_segment_group(&service, id, group_id).await?;
        }

        Pruner::new(service.clone())
            .with_failure_policy(self.prune_failure_policy)
            .prune_in(id, ReferenceKind::App, &self.detach_policy_types)
            .await?;

        match service.delete::<AppSegmentPra>(id).await {
            Ok(()) => {
                tracing::info!(entity_id = %id, "deleted PRA application segment");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ManagedResource for AppSegmentPraResource {
    type State = AppSegmentPraState;

    fn type_name(&self) -> &'static str {
        "zpa_application_segment_pra"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            self.create_inner(plan)
                .await
                .map_err(|e| e.with_resource(KIND, &plan.name))
        })
    }

    fn read<'a>(
        &'a self,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<ReadOutcome<Self::State>, ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);
            match self.read_back(&service, id, state).await {
                Ok(fresh) => Ok(ReadOutcome::Present(fresh)),
                Err(e) if e.is_not_found() => {
                    tracing::info!(
                        entity_id = %id,
                        "PRA application segment gone, removing from state"
                    );
                    Ok(ReadOutcome::Removed)
                }
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
            self.update_inner(plan, state)
                .await
                .map_err(|e| e.with_resource(KIND, state.id.trimmed().unwrap_or_default()))
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            self.delete_inner(state)
                .await
                .map_err(|e| e.with_resource(KIND, state.id.trimmed().unwrap_or_default()))
        })
    }

    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let remote: AppSegmentPra = lookup_for_import(&self.service, id).await?;
            Ok(flatten(remote, &AppSegmentPraState::default()))
        })
    }
}
