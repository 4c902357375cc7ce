//! `zpa_pra_credential`
//!
//! Secrets are write-only: the server stores them but never returns them, so
//! state carries the secret the user last set rather than the read-back.

use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::models::PraCredential;

use super::{lookup_for_import, non_empty, not_found_as, scoped, state_id};
use crate::config::ProviderConfig;
use crate::diag::Diagnostics;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::prune::{PruneFailurePolicy, Pruner, ReferenceKind};
use crate::resource::{ManagedResource, ReadOutcome};

const KIND: &str = "PRA credential";

pub const CREDENTIAL_TYPES: [&str; 3] = ["USERNAME_PASSWORD", "SSH_KEY", "PASSWORD"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PraCredentialState {
    pub id: Attr<String>,
    pub name: String,
    pub description: Attr<String>,
    pub credential_type: String,
    pub user_domain: Attr<String>,
    pub user_name: Attr<String>,
    pub password: Attr<String>,
    pub private_key: Attr<String>,
    pub passphrase: Attr<String>,
    pub microtenant_id: Attr<String>,
}

/// Plan value when set, else the prior state's.
fn keep(plan: &Attr<String>, prior: &Attr<String>) -> Attr<String> {
    match plan {
        Attr::Known(_) => plan.clone(),
        _ => prior.clone(),
    }
}

impl PraCredentialState {
    fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if self.name.trim().is_empty() {
            diags.error("Invalid configuration", "name must be provided");
        }

        let credential_type = self.credential_type.trim().to_uppercase();
        if !CREDENTIAL_TYPES.contains(&credential_type.as_str()) {
            diags.error(
                "Invalid configuration",
                format!(
                    "credential_type must be one of {}, got {:?}",
                    CREDENTIAL_TYPES.join(", "),
                    self.credential_type
                ),
            );
            return diags;
        }

        let needs = |attr: &Attr<String>| attr.trimmed().is_none() && !attr.is_unknown();
        let require = |diags: &mut Diagnostics, field: &str| {
            diags.error(
                "Invalid configuration",
                format!("{field} is required for credential_type {credential_type}"),
            );
        };
        match credential_type.as_str() {
            "USERNAME_PASSWORD" => {
                if needs(&self.user_name) {
                    require(&mut diags, "user_name");
                }
                if needs(&self.password) {
                    require(&mut diags, "password");
                }
            }
            "SSH_KEY" => {
                if needs(&self.user_name) {
                    require(&mut diags, "user_name");
                }
                if needs(&self.private_key) {
                    require(&mut diags, "private_key");
                }
            }
            _ => {
                if needs(&self.password) {
                    require(&mut diags, "password");
                }
            }
        }
        diags
    }

    fn expand(&self) -> PraCredential {
        let text = |attr: &Attr<String>| attr.trimmed().unwrap_or_default().to_string();
        PraCredential {
            id: text(&self.id),
            name: self.name.trim().to_string(),
            description: text(&self.description),
            credential_type: self.credential_type.trim().to_uppercase(),
            user_domain: text(&self.user_domain),
            user_name: text(&self.user_name),
            // Secrets are sent verbatim; whitespace may be significant.
            password: self.password.known().cloned().unwrap_or_default(),
            private_key: self.private_key.known().cloned().unwrap_or_default(),
            passphrase: self.passphrase.known().cloned().unwrap_or_default(),
            microtenant_id: self.microtenant_id.trimmed().map(str::to_string),
        }
    }

    /// Read-back overlaid with the fields the server never echoes.
    fn flatten(remote: PraCredential, prior: &PraCredentialState) -> Self {
        Self {
            id: non_empty(&remote.id),
            name: remote.name,
            description: non_empty(&remote.description),
            credential_type: remote.credential_type,
            user_domain: prior.user_domain.clone(),
            user_name: match non_empty(&remote.user_name) {
                Attr::Known(name) => Attr::Known(name),
                _ => prior.user_name.clone(),
            },
            password: prior.password.clone(),
            private_key: prior.private_key.clone(),
            passphrase: prior.passphrase.clone(),
            microtenant_id: remote
                .microtenant_id
                .map_or_else(|| prior.microtenant_id.clone(), |id| non_empty(&id)),
        }
    }
}

pub struct PraCredentialResource {
    service: Service,
    prune_failure_policy: PruneFailurePolicy,
}

impl PraCredentialResource {
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
        prior: &PraCredentialState,
    ) -> Result<PraCredentialState, ProvisionerError> {
        let remote: PraCredential = service.get(id).await.map_err(not_found_as(KIND, id))?;
        Ok(PraCredentialState::flatten(remote, prior))
    }
}

impl ManagedResource for PraCredentialResource {
    type State = PraCredentialState;

    fn type_name(&self) -> &'static str {
        "zpa_pra_credential_controller"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            plan.validate().into_result(())?;
            let service = scoped(&self.service, &plan.microtenant_id);
            let created = service
                .create(&plan.expand())
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, &plan.name))?;
            tracing::info!(
                entity_id = %created.id,
                credential_type = %created.credential_type,
                "created PRA credential"
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
            if !plan.credential_type.trim().eq_ignore_ascii_case(state.credential_type.trim()) {
                let mut diags = Diagnostics::new();
                diags.error("Invalid update", "changing credential_type is not supported");
                return Err(ProvisionerError::Validation(diags).with_resource(KIND, id));
            }

            // Unset secrets keep the value already on the server.
            let mut merged = plan.clone();
            merged.password = keep(&plan.password, &state.password);
            merged.private_key = keep(&plan.private_key, &state.private_key);
            merged.passphrase = keep(&plan.passphrase, &state.passphrase);
            merged.user_domain = keep(&plan.user_domain, &state.user_domain);
            merged.validate().into_result(())?;

            let service = scoped(&self.service, &plan.microtenant_id);
            let mut payload = merged.expand();
            payload.id = id.to_string();
            service.update(id, &payload).await.map_err(|e| {
                ProvisionerError::from(e).with_resource(KIND, id)
            })?;
            tracing::info!(entity_id = %id, "updated PRA credential");
            self.fetch(&service, id, &merged).await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            let id = state_id(KIND, &state.id)?;
            let service = scoped(&self.service, &state.microtenant_id);

            Pruner::new(service.clone())
                .with_failure_policy(self.prune_failure_policy)
                .prune(id, ReferenceKind::Credential)
                .await
                .map_err(|e| e.with_resource(KIND, id))?;

            match service.delete::<PraCredential>(id).await {
                Ok(()) => {
                    tracing::info!(entity_id = %id, "deleted PRA credential");
                    Ok(())
                }
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(ProvisionerError::from(e).with_resource(KIND, id)),
            }
        })
    }

    /// Secrets cannot be imported; they stay null until the next apply.
    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let remote: PraCredential = lookup_for_import(&self.service, id).await?;
            Ok(PraCredentialState::flatten(remote, &PraCredentialState::default()))
        })
    }
}
