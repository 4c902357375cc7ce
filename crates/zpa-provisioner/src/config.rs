use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zpa_client::{Service, Transport};
use zpa_core::{PolicyType, Scope};

use crate::error::ProvisionerError;
use crate::prune::{APP_POLICY_TYPES, PruneFailurePolicy};
use crate::reconcile::DuplicateKeys;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

pub const ENV_CUSTOMER_ID: &str = "ZPA_CUSTOMER_ID";
pub const ENV_MICROTENANT_ID: &str = "ZPA_MICROTENANT_ID";
pub const ENV_CLOUD: &str = "ZPA_CLOUD";

const DEFAULT_CLOUD: &str = "PRODUCTION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microtenant_id: Option<String>,
    #[serde(default = "default_cloud")]
    pub cloud: String,
    #[serde(default)]
    pub duplicate_keys: DuplicateKeys,
    /// Added in v1, replacing the v0 `strict_prune` flag.
    #[serde(default)]
    pub prune_failure_policy: PruneFailurePolicy,
    /// Rule collections scanned when an application segment is deleted.
    #[serde(default = "default_app_detach_policy_types")]
    pub app_detach_policy_types: Vec<PolicyType>,
}

fn default_cloud() -> String {
    DEFAULT_CLOUD.to_string()
}

fn default_app_detach_policy_types() -> Vec<PolicyType> {
    APP_POLICY_TYPES.to_vec()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            customer_id: String::new(),
            microtenant_id: None,
            cloud: default_cloud(),
            duplicate_keys: DuplicateKeys::default(),
            prune_failure_policy: PruneFailurePolicy::default(),
            app_detach_policy_types: default_app_detach_policy_types(),
        }
    }
}

impl ProviderConfig {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            ..Self::default()
        }
    }

    /// Load from disk, migrate, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ProvisionerError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProvisionerError::Config(format!("failed to read config at {}: {e}", path.display()))
        })?;
        let mut config = Self::from_json(&contents)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and migrate without consulting the environment.
    pub fn from_json(contents: &str) -> Result<Self, ProvisionerError> {
        // Parse as raw JSON so we can run migrations before deserializing.
        let json: serde_json::Value = serde_json::from_str(contents)?;
        let on_disk_version = json
            .get("config_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        let migrated = migrate(json, on_disk_version)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Override fields from environment variables. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(customer_id) = var(ENV_CUSTOMER_ID) {
            self.customer_id = customer_id;
        }
        if let Some(microtenant_id) = var(ENV_MICROTENANT_ID) {
            self.microtenant_id = Some(microtenant_id);
        }
        if let Some(cloud) = var(ENV_CLOUD) {
            self.cloud = cloud.to_uppercase();
        }
    }

    pub fn validate(&self) -> Result<(), ProvisionerError> {
        if self.customer_id.trim().is_empty() {
            return Err(ProvisionerError::Config(format!(
                "customer_id is required (set it in the config file or {ENV_CUSTOMER_ID})"
            )));
        }
        if self.app_detach_policy_types.is_empty() {
            return Err(ProvisionerError::Config(
                "app_detach_policy_types must name at least one policy type".into(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ProvisionerError> {
        // Always write the current version, regardless of what was loaded.
        let mut stamped = self.clone();
        stamped.config_version = CURRENT_VERSION;
        let json = serde_json::to_string_pretty(&stamped)?;

        // Write to a temp file then rename for atomicity
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json.as_bytes())?;
        std::fs::rename(&tmp_path, path)?;

        tracing::info!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn scope(&self) -> Scope {
        Scope::from_optional(self.microtenant_id.as_deref())
    }

    /// A service for this customer, narrowed to the configured microtenant.
    pub fn service(&self, transport: Arc<dyn Transport>) -> Service {
        Service::new(transport, self.customer_id.trim()).with_scope(self.scope())
    }
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
fn migrate(
    mut json: serde_json::Value,
    from_version: u32,
) -> Result<serde_json::Value, ProvisionerError> {
    if from_version > CURRENT_VERSION {
        return Err(ProvisionerError::Config(format!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION})"
        )));
    }

    // v0 → v1: strict_prune (bool) becomes prune_failure_policy
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| ProvisionerError::Config("config is not a JSON object".into()))?;
        let strict = obj
            .remove("strict_prune")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let policy = if strict { "strict" } else { "best_effort" };
        obj.entry("prune_failure_policy")
            .or_insert(serde_json::Value::String(policy.into()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (strict_prune → prune_failure_policy)");
    }

    Ok(json)
}
