//! Back-reference pruning.
//!
//! Policy rules point at other entities by id with no reverse index, so
//! before deleting an entity every rule that might reference it is fetched,
//! the matching references are removed, and dirty rules are written back.
//! Each policy type's read-modify-write cycle runs under that type's lock so
//! two concurrent deletes cannot overwrite each other's edits.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use zpa_client::Service;
use zpa_core::PolicyType;
use zpa_core::models::PolicyRule;

use crate::error::ProvisionerError;

/// Policy types scanned when detaching applications and segment groups.
pub const APP_POLICY_TYPES: [PolicyType; 5] = [
    PolicyType::AccessPolicy,
    PolicyType::TimeoutPolicy,
    PolicyType::SiemPolicy,
    PolicyType::ClientForwardingPolicy,
    PolicyType::InspectionPolicy,
];

/// Process-wide named mutexes, one per referencing collection.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PolicyType, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every pruner in the process.
    pub fn shared() -> Arc<LockRegistry> {
        static SHARED: OnceLock<Arc<LockRegistry>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(LockRegistry::new())).clone()
    }

    pub fn lock_for(&self, policy_type: PolicyType) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(policy_type).or_default().clone()
    }

    pub async fn acquire(&self, policy_type: PolicyType) -> OwnedMutexGuard<()> {
        self.lock_for(policy_type).lock_owned().await
    }
}

/// The kind of entity a policy rule can reference.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    App,
    AppGroup,
    ServerGroup,
    Credential,
    Console,
}

impl ReferenceKind {
    /// Operand `objectType` naming this kind.
    pub fn object_type(&self) -> &'static str {
        match self {
            Self::App => "APP",
            Self::AppGroup => "APP_GROUP",
            Self::ServerGroup => "SERVER_GROUP",
            Self::Credential => "CREDENTIAL",
            Self::Console => "CONSOLE",
        }
    }

    /// Rule collections this kind can appear in.
    pub fn policy_types(&self) -> &'static [PolicyType] {
        match self {
            Self::App | Self::AppGroup => &APP_POLICY_TYPES,
            Self::ServerGroup => &[PolicyType::AccessPolicy],
            Self::Credential | Self::Console => &[PolicyType::CredentialPolicy],
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.object_type())
    }
}

/// How per-rule update failures affect the prune result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneFailurePolicy {
    /// Log, record in the report, and let the delete proceed.
    #[default]
    BestEffort,
    /// Fail with [`ProvisionerError::PruneIncomplete`].
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub policy_type: PolicyType,
    pub rule_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub kind: ReferenceKind,
    pub entity_id: String,
    pub scanned: usize,
    pub updated: Vec<String>,
    pub failed: Vec<RuleFailure>,
}

impl PruneReport {
    fn new(kind: ReferenceKind, entity_id: &str) -> Self {
        Self {
            kind,
            entity_id: entity_id.to_string(),
            scanned: 0,
            updated: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Remove every reference to `entity_id` of `kind` from `rule`.
///
/// Only the matching entry goes: an operand whose `rhs` matches is dropped,
/// a multi-valued operand loses just that value (and is dropped once empty),
/// and a condition emptied this way is dropped. Returns whether anything
/// changed.
pub fn detach(rule: &mut PolicyRule, kind: ReferenceKind, entity_id: &str) -> bool {
    if kind == ReferenceKind::ServerGroup {
        let before = rule.app_server_groups.len();
        rule.app_server_groups.retain(|group| group.id != entity_id);
        return rule.app_server_groups.len() != before;
    }

    let object_type = kind.object_type();
    let mut changed = false;
    let mut emptied = Vec::new();

    for (index, condition) in rule.conditions.iter_mut().enumerate() {
        let before = condition.operands.len();
        condition.operands.retain_mut(|operand| {
            if !operand.references(object_type, entity_id) {
                return true;
            }
            changed = true;
            if operand.rhs == entity_id {
                return false;
            }
            operand.values.retain(|v| v != entity_id);
            !operand.values.is_empty()
        });
        if before > 0 && condition.operands.is_empty() {
            emptied.push(index);
        }
    }

    if !emptied.is_empty() {
        let mut index = 0;
        rule.conditions.retain(|_| {
            let keep = !emptied.contains(&index);
            index += 1;
            keep
        });
    }
    changed
}

pub struct Pruner {
    service: Service,
    locks: Arc<LockRegistry>,
    failure_policy: PruneFailurePolicy,
}

impl Pruner {
    pub fn new(service: Service) -> Self {
        Self {
            service,
            locks: LockRegistry::shared(),
            failure_policy: PruneFailurePolicy::default(),
        }
    }

    pub fn with_locks(mut self, locks: Arc<LockRegistry>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: PruneFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Remove every reference to `entity_id` from the rule collections
    /// `kind` can appear in.
    pub async fn prune(
        &self,
        entity_id: &str,
        kind: ReferenceKind,
    ) -> Result<PruneReport, ProvisionerError> {
        self.prune_in(entity_id, kind, kind.policy_types()).await
    }

    /// [`Pruner::prune`] over an explicit set of rule collections.
    ///
    /// Failing to list a collection aborts; a failed rule update (or a
    /// missing policy set for it) is logged and recorded, and handled per the
    /// failure policy once every collection was processed.
    pub async fn prune_in(
        &self,
        entity_id: &str,
        kind: ReferenceKind,
        policy_types: &[PolicyType],
    ) -> Result<PruneReport, ProvisionerError> {
        let mut report = PruneReport::new(kind, entity_id);

        for &policy_type in policy_types {
            let _guard = self.locks.acquire(policy_type).await;

            let rules = self.service.rules_by_type(policy_type).await?;
            // Looked up once, on the first dirty rule that lacks one.
            let mut policy_set_id: Option<Result<String, String>> = None;

            for mut rule in rules {
                report.scanned += 1;
                if !detach(&mut rule, kind, entity_id) {
                    continue;
                }

                if rule.policy_set_id.is_empty() {
                    let lookup = match &policy_set_id {
                        Some(cached) => cached.clone(),
                        None => {
                            let fetched = match self.service.policy_set_by_type(policy_type).await {
                                Ok(set) => Ok(set.id),
                                Err(e) if e.is_cancelled() => return Err(e.into()),
                                Err(e) => Err(e.to_string()),
                            };
                            policy_set_id = Some(fetched.clone());
                            fetched
                        }
                    };
                    match lookup {
                        Ok(id) => rule.policy_set_id = id,
                        Err(error) => {
                            tracing::warn!(
                                entity_id = %entity_id,
                                kind = %kind,
                                policy_type = %policy_type,
                                rule_id = %rule.id,
                                error = %error,
                                "no policy set for rule, reference left in place"
                            );
                            report.failed.push(RuleFailure {
                                policy_type,
                                rule_id: rule.id,
                                error,
                            });
                            continue;
                        }
                    }
                }

                match self.service.update_rule(policy_type, &rule.id, &rule).await {
                    Ok(()) => {
                        tracing::info!(
                            entity_id = %entity_id,
                            kind = %kind,
                            policy_type = %policy_type,
                            rule_id = %rule.id,
                            "detached reference from policy rule"
                        );
                        report.updated.push(rule.id);
                    }
                    Err(e) if e.is_cancelled() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(
                            entity_id = %entity_id,
                            kind = %kind,
                            policy_type = %policy_type,
                            rule_id = %rule.id,
                            error = %e,
                            "failed to detach reference from policy rule"
                        );
                        report.failed.push(RuleFailure {
                            policy_type,
                            rule_id: rule.id,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        if !report.is_complete() && self.failure_policy == PruneFailurePolicy::Strict {
            return Err(ProvisionerError::PruneIncomplete {
                kind: kind.to_string(),
                id: entity_id.to_string(),
                failed_rules: report.failed.iter().map(|f| f.rule_id.clone()).collect(),
            });
        }
        Ok(report)
    }
}
