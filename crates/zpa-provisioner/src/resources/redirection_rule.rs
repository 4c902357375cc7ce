//! `zpa_policy_access_redirection_rule`

use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::PolicyType;
use zpa_core::models::{Condition, IdRef, PolicyRule};

use super::{non_empty, not_found_as, scoped, state_id};
use crate::diag::Diagnostics;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::reconcile::order_like_plan;
use crate::resource::{ManagedResource, ReadOutcome};

const KIND: &str = "redirection policy rule";
const POLICY_TYPE: PolicyType = PolicyType::RedirectionPolicy;

pub const REDIRECT_DEFAULT: &str = "REDIRECT_DEFAULT";
pub const REDIRECT_PREFERRED: &str = "REDIRECT_PREFERRED";
pub const REDIRECT_ALWAYS: &str = "REDIRECT_ALWAYS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectionRuleState {
    pub id: Attr<String>,
    pub name: String,
    pub description: Attr<String>,
    pub action: String,
    pub operator: Attr<String>,
    pub rule_order: Attr<String>,
    pub policy_set_id: Attr<String>,
    pub service_edge_group_ids: Vec<String>,
    pub conditions: Vec<Condition>,
    pub microtenant_id: Attr<String>,
}

/// Check the action against the service edge groups it needs.
pub fn validate(plan: &RedirectionRuleState) -> Diagnostics {
    let mut diags = Diagnostics::new();
    if plan.name.trim().is_empty() {
        diags.error("Invalid configuration", "name must be provided");
    }

    let has_groups = plan.service_edge_group_ids.iter().any(|id| !id.trim().is_empty());
    match plan.action.trim() {
        action @ (REDIRECT_PREFERRED | REDIRECT_ALWAYS) if !has_groups => {
            diags.error(
                "Invalid configuration",
                format!(
                    "one or more private service edge groups must be selected when the action is {action}"
                ),
            );
        }
        REDIRECT_DEFAULT if has_groups => {
            diags.error(
                "Invalid configuration",
                "private service edge groups must be empty when the action is REDIRECT_DEFAULT",
            );
        }
        REDIRECT_DEFAULT | REDIRECT_PREFERRED | REDIRECT_ALWAYS => {}
        other => {
            diags.error(
                "Invalid configuration",
                format!(
                    "action {other:?} must be one of {REDIRECT_DEFAULT}, {REDIRECT_PREFERRED}, {REDIRECT_ALWAYS}"
                ),
            );
        }
    }
    diags
}

impl RedirectionRuleState {
    fn expand(&self, policy_set_id: &str) -> Result<PolicyRule, ProvisionerError> {
        validate(self).into_result(PolicyRule {
            id: self.id.trimmed().unwrap_or_default().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trimmed().unwrap_or_default().to_string(),
            action: self.action.trim().to_string(),
            policy_set_id: policy_set_id.to_string(),
            policy_type: Some(POLICY_TYPE),
            operator: self.operator.trimmed().unwrap_or_default().to_string(),
            rule_order: self.rule_order.trimmed().unwrap_or_default().to_string(),
            conditions: self.conditions.clone(),
            service_edge_groups: self
                .service_edge_group_ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(IdRef::new)
                .collect(),
            microtenant_id: self.microtenant_id.trimmed().map(str::to_string),
            ..PolicyRule::default()
        })
    }

    fn flatten(remote: PolicyRule, prior: &RedirectionRuleState) -> Self {
        let groups = remote.service_edge_groups.into_iter().map(|g| g.id).collect();
        Self {
            id: non_empty(&remote.id),
            name: remote.name,
            description: non_empty(&remote.description),
            action: remote.action,
            operator: non_empty(&remote.operator),
            rule_order: non_empty(&remote.rule_order),
            policy_set_id: non_empty(&remote.policy_set_id)
                .or_known(prior.policy_set_id.known().cloned()),
            service_edge_group_ids: order_like_plan(&prior.service_edge_group_ids, groups, |id| {
                id.as_str()
            }),
            conditions: remote.conditions,
            microtenant_id: remote
                .microtenant_id
                .map_or_else(|| prior.microtenant_id.clone(), |id| non_empty(&id)),
        }
    }
}

pub struct RedirectionRuleResource {
    service: Service,
}

impl RedirectionRuleResource {
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    async fn policy_set_id(
        &self,
        service: &Service,
        known: &Attr<String>,
    ) -> Result<String, ProvisionerError> {
        if let Some(id) = known.trimmed() {
            return Ok(id.to_string());
        }
        let set = service.policy_set_by_type(POLICY_TYPE).await?;
        Ok(set.id)
    }

    async fn fetch(
        &self,
        service: &Service,
        id: &str,
        prior: &RedirectionRuleState,
    ) -> Result<RedirectionRuleState, ProvisionerError> {
        let remote = service
            .get_rule(POLICY_TYPE, id)
            .await
            .map_err(not_found_as(KIND, id))?;
        Ok(RedirectionRuleState::flatten(remote, prior))
    }
}

impl ManagedResource for RedirectionRuleResource {
    type State = RedirectionRuleState;

    fn type_name(&self) -> &'static str {
        "zpa_policy_access_redirection_rule"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            validate(plan).into_result(())?;
            let service = scoped(&self.service, &plan.microtenant_id);
            let policy_set_id = self.policy_set_id(&service, &plan.policy_set_id).await?;
            let payload = plan.expand(&policy_set_id)?;

            let created = service
                .create_rule(POLICY_TYPE, &payload)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, &plan.name))?;
            tracing::info!(
                rule_id = %created.id,
                policy_set_id = %policy_set_id,
                "created redirection rule"
            );
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
            validate(plan).into_result(())?;
            let service = scoped(&self.service, &plan.microtenant_id);
            let known_set = plan
                .policy_set_id
                .clone()
                .or_known(state.policy_set_id.known().cloned());
            let policy_set_id = self.policy_set_id(&service, &known_set).await?;

            let mut payload = plan.expand(&policy_set_id)?;
            payload.id = id.to_string();
            service
                .update_rule(POLICY_TYPE, id, &payload)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, id))?;
            tracing::info!(rule_id = %id, "updated redirection rule");
            self.fetch(&service, id, plan).await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);
            match service.delete_rule(POLICY_TYPE, id).await {
                Ok(()) => {
                    tracing::info!(rule_id = %id, "deleted redirection rule");
                    Ok(())
                }
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(ProvisionerError::from(e).with_resource(KIND, id)),
            }
        })
    }

    /// Accepts a rule id or a rule name.
    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let raw = id.trim();
            if raw.is_empty() {
                return Err(ProvisionerError::MissingIdentifier { kind: KIND.to_string() });
            }

            let remote = if raw.bytes().all(|b| b.is_ascii_digit()) {
                self.service
                    .get_rule(POLICY_TYPE, raw)
                    .await
                    .map_err(not_found_as(KIND, raw))?
            } else {
                self.service
                    .rules_by_type(POLICY_TYPE)
                    .await?
                    .into_iter()
                    .find(|rule| rule.name.eq_ignore_ascii_case(raw))
                    .ok_or_else(|| ProvisionerError::LookupNotFound {
                        kind: KIND.to_string(),
                        name: raw.to_string(),
                    })?
            };
            Ok(RedirectionRuleState::flatten(remote, &RedirectionRuleState::default()))
        })
    }
}
