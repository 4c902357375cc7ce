//! `zpa_app_connector_assistant_schedule`
//!
//! A tenant-wide singleton that cannot be deleted through the API. Create
//! adopts an existing schedule; delete only forgets it.

use serde::{Deserialize, Serialize};
use zpa_client::{BoxFuture, Service};
use zpa_core::models::AssistantSchedule;

use super::non_empty;
use crate::diag::Diagnostics;
use crate::error::ProvisionerError;
use crate::plan::Attr;
use crate::resource::{ManagedResource, ReadOutcome};
use crate::upsert::{Upserted, create_or_adopt};

const KIND: &str = "assistant schedule";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantScheduleState {
    pub id: Attr<String>,
    /// Defaults to the provider's customer id.
    pub customer_id: Attr<String>,
    pub enabled: bool,
    pub delete_disabled: bool,
    pub frequency: String,
    pub frequency_interval: String,
}

impl AssistantScheduleState {
    fn flatten(remote: AssistantSchedule) -> Self {
        Self {
            id: non_empty(&remote.id),
            customer_id: non_empty(&remote.customer_id),
            enabled: remote.enabled,
            delete_disabled: remote.delete_disabled,
            frequency: remote.frequency,
            frequency_interval: remote.frequency_interval,
        }
    }
}

pub struct AssistantScheduleResource {
    service: Service,
}

impl AssistantScheduleResource {
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    fn build(&self, plan: &AssistantScheduleState) -> Result<AssistantSchedule, ProvisionerError> {
        let customer_id = plan
            .customer_id
            .trimmed()
            .unwrap_or_else(|| self.service.customer_id())
            .to_string();

        let mut diags = Diagnostics::new();
        if customer_id.is_empty() {
            diags.error(
                "Missing customer ID",
                "customer_id must be specified either in the resource or provider configuration",
            );
        }

        let schedule = AssistantSchedule {
            id: plan.id.trimmed().unwrap_or_default().to_string(),
            customer_id,
            enabled: plan.enabled,
            delete_disabled: plan.delete_disabled,
            frequency: plan.frequency.trim().to_string(),
            frequency_interval: plan.frequency_interval.trim().to_string(),
        };
        if let Err(e) = schedule.validate() {
            diags.error("Invalid configuration", e.to_string());
        }
        diags.into_result(schedule)
    }
}

impl ManagedResource for AssistantScheduleResource {
    type State = AssistantScheduleState;

    fn type_name(&self) -> &'static str {
        "zpa_app_connector_assistant_schedule"
    }

    fn create<'a>(
        &'a self,
        plan: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let schedule = self.build(plan)?;
            let upserted = create_or_adopt(&self.service, &schedule)
                .await
                .map_err(|e| e.with_resource(KIND, &schedule.customer_id))?;
            if let Upserted::Adopted(existing) = &upserted {
                tracing::warn!(
                    entity_id = %existing.id,
                    "assistant schedule already existed, adopted it"
                );
            }
            Ok(AssistantScheduleState::flatten(upserted.into_inner()))
        })
    }

    fn read<'a>(
        &'a self,
        _state: &'a Self::State,
    ) -> BoxFuture<'a, Result<ReadOutcome<Self::State>, ProvisionerError>> {
        Box::pin(async move {
            match self.service.get_schedule().await {
                Ok(remote) => Ok(ReadOutcome::Present(AssistantScheduleState::flatten(remote))),
                Err(e) if e.is_not_found() => Ok(ReadOutcome::Removed),
                Err(e) => Err(ProvisionerError::from(e).with_resource(KIND, "")),
            }
        })
    }

    fn update<'a>(
        &'a self,
        plan: &'a Self::State,
        state: &'a Self::State,
    ) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let mut schedule = self.build(plan)?;
            // The singleton's id is whatever the server has now.
            let id = match state.id.trimmed() {
                Some(id) => id.to_string(),
                None => self.service.get_schedule().await?.id,
            };
            schedule.id = id.clone();

            self.service
                .update_schedule(&id, &schedule)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource(KIND, &id))?;
            tracing::info!(entity_id = %id, "updated assistant schedule");

            let remote = self.service.get_schedule().await?;
            Ok(AssistantScheduleState::flatten(remote))
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State) -> BoxFuture<'a, Result<(), ProvisionerError>> {
        Box::pin(async move {
            tracing::info!(
                entity_id = %state.id.trimmed().unwrap_or_default(),
                "assistant schedule cannot be deleted, forgetting it"
            );
            Ok(())
        })
    }

    fn import<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Self::State, ProvisionerError>> {
        Box::pin(async move {
            let remote = self.service.get_schedule().await?;
            let wanted = id.trim();
            if !wanted.is_empty() && remote.id != wanted {
                return Err(ProvisionerError::NotFound {
                    kind: KIND.to_string(),
                    id: wanted.to_string(),
                });
            }
            Ok(AssistantScheduleState::flatten(remote))
        })
    }
}
