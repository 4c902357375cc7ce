use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use zpa_core::models::{AssistantSchedule, PolicyRule, PolicySet, WeightedLbConfig};
use zpa_core::{Collection, Entity, PolicyType, Scope, paths};

use crate::error::ClientError;
use crate::transport::{Method, Request, Response, Transport};

/// Typed access to one customer's management API.
///
/// Cheap to clone. Every call is narrowed to [`Service::scope`] and races the
/// cancellation token, returning [`ClientError::Cancelled`] as soon as the
/// token fires.
#[derive(Clone)]
pub struct Service {
    transport: Arc<dyn Transport>,
    customer_id: String,
    scope: Scope,
    cancel: CancellationToken,
}

impl Service {
    pub fn new(transport: Arc<dyn Transport>, customer_id: impl Into<String>) -> Self {
        Self {
            transport,
            customer_id: customer_id.into(),
            scope: Scope::tenant(),
            cancel: CancellationToken::new(),
        }
    }

    /// Narrow all calls to a microtenant. Blank ids keep the current scope.
    pub fn with_microtenant(&self, microtenant_id: Option<&str>) -> Self {
        match Scope::from_optional(microtenant_id) {
            scope if scope.microtenant_id.is_some() => self.with_scope(scope),
            _ => self.clone(),
        }
    }

    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> Result<Response, ClientError> {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        tracing::debug!(method = %method, path = %path, scope = %self.scope, "api request");
        let request = Request {
            method,
            path,
            scope: self.scope.clone(),
            body,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            response = self.transport.send(request) => response,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: String) -> Result<T, ClientError> {
        let response = self.send(Method::Get, path, None).await?;
        Ok(serde_json::from_value(response.body)?)
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: String) -> Result<Vec<T>, ClientError> {
        let response = self.send(Method::Get, path, None).await?;
        let list = match response.body {
            Value::Object(mut page) => page.remove("list").unwrap_or(Value::Array(vec![])),
            Value::Null => Value::Array(vec![]),
            other => other,
        };
        Ok(serde_json::from_value(list)?)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: String,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::Post, path, Some(body)).await?;
        Ok(serde_json::from_value(response.body)?)
    }

    async fn put<B: Serialize>(&self, path: String, body: &B) -> Result<(), ClientError> {
        let body = serde_json::to_value(body)?;
        self.send(Method::Put, path, Some(body)).await?;
        Ok(())
    }

    // ── entities ──────────────────────────────────────────────────────────

    pub async fn create<T: Entity>(&self, entity: &T) -> Result<T, ClientError> {
        self.post(paths::collection(&self.customer_id, T::COLLECTION), entity).await
    }

    /// Fails with a NotFound-coded error when `id` is absent server-side.
    pub async fn get<T: Entity>(&self, id: &str) -> Result<T, ClientError> {
        self.fetch(paths::item(&self.customer_id, T::COLLECTION, id)).await
    }

    pub async fn list<T: Entity>(&self) -> Result<Vec<T>, ClientError> {
        self.fetch_list(paths::collection(&self.customer_id, T::COLLECTION)).await
    }

    /// Case-insensitive exact name match. NotFound when nothing matches.
    pub async fn get_by_name<T: Entity>(&self, name: &str) -> Result<T, ClientError> {
        let path = paths::collection(&self.customer_id, T::COLLECTION);
        let wanted = name.trim();
        self.fetch_list::<T>(path.clone())
            .await?
            .into_iter()
            .find(|e| e.name().trim().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ClientError::not_found(
                    &path,
                    format!("no {} named {wanted:?}", T::COLLECTION.label()),
                )
            })
    }

    pub async fn update<T: Entity>(&self, id: &str, entity: &T) -> Result<(), ClientError> {
        self.put(paths::item(&self.customer_id, T::COLLECTION, id), entity).await
    }

    pub async fn delete<T: Entity>(&self, id: &str) -> Result<(), ClientError> {
        let path = paths::item(&self.customer_id, T::COLLECTION, id);
        self.send(Method::Delete, path, None).await?;
        Ok(())
    }

    // ── policy rules ──────────────────────────────────────────────────────

    pub async fn policy_set_by_type(
        &self,
        policy_type: PolicyType,
    ) -> Result<PolicySet, ClientError> {
        let path = paths::collection(&self.customer_id, Collection::PolicySets);
        self.fetch_list::<PolicySet>(path.clone())
            .await?
            .into_iter()
            .find(|set| set.policy_type == Some(policy_type))
            .ok_or_else(|| {
                ClientError::not_found(&path, format!("no policy set of type {policy_type}"))
            })
    }

    pub async fn rules_by_type(
        &self,
        policy_type: PolicyType,
    ) -> Result<Vec<PolicyRule>, ClientError> {
        self.fetch_list(paths::policy_rules(&self.customer_id, policy_type)).await
    }

    pub async fn get_rule(
        &self,
        policy_type: PolicyType,
        rule_id: &str,
    ) -> Result<PolicyRule, ClientError> {
        self.fetch(rule_path(&self.customer_id, policy_type, rule_id)).await
    }

    pub async fn create_rule(
        &self,
        policy_type: PolicyType,
        rule: &PolicyRule,
    ) -> Result<PolicyRule, ClientError> {
        self.post(paths::policy_rules(&self.customer_id, policy_type), rule).await
    }

    pub async fn update_rule(
        &self,
        policy_type: PolicyType,
        rule_id: &str,
        rule: &PolicyRule,
    ) -> Result<(), ClientError> {
        self.put(rule_path(&self.customer_id, policy_type, rule_id), rule).await
    }

    pub async fn delete_rule(
        &self,
        policy_type: PolicyType,
        rule_id: &str,
    ) -> Result<(), ClientError> {
        let path = rule_path(&self.customer_id, policy_type, rule_id);
        self.send(Method::Delete, path, None).await?;
        Ok(())
    }

    // ── assistant schedule (tenant singleton) ─────────────────────────────

    pub async fn create_schedule(
        &self,
        schedule: &AssistantSchedule,
    ) -> Result<AssistantSchedule, ClientError> {
        self.create(schedule).await
    }

    pub async fn get_schedule(&self) -> Result<AssistantSchedule, ClientError> {
        let path = paths::collection(&self.customer_id, Collection::AssistantSchedules);
        self.fetch_list::<AssistantSchedule>(path.clone())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::not_found(&path, "no assistant schedule configured"))
    }

    pub async fn update_schedule(
        &self,
        id: &str,
        schedule: &AssistantSchedule,
    ) -> Result<(), ClientError> {
        self.update(id, schedule).await
    }

    // ── weighted load balancing ───────────────────────────────────────────

    pub async fn weighted_lb_config(
        &self,
        application_id: &str,
    ) -> Result<WeightedLbConfig, ClientError> {
        let path = paths::item(&self.customer_id, Collection::WeightedLbConfigs, application_id);
        self.fetch(path).await
    }

    pub async fn update_weighted_lb_config(
        &self,
        application_id: &str,
        config: &WeightedLbConfig,
    ) -> Result<(), ClientError> {
        let path = paths::item(&self.customer_id, Collection::WeightedLbConfigs, application_id);
        self.put(path, config).await
    }
}

fn rule_path(customer_id: &str, policy_type: PolicyType, rule_id: &str) -> String {
    paths::item(customer_id, Collection::PolicyRules(policy_type), rule_id)
}
