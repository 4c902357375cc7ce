use serde::{Deserialize, Serialize};

use crate::entity::Collection;
use crate::error::CoreError;

pub const FREQUENCY_DAYS: &str = "days";
pub const FREQUENCY_INTERVALS: [&str; 6] = ["5", "7", "14", "30", "60", "90"];

/// Tenant-wide schedule that deletes inactive connectors. One per tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantSchedule {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub customer_id: String,
    pub enabled: bool,
    pub delete_disabled: bool,
    pub frequency: String,
    pub frequency_interval: String,
}

impl crate::entity::Entity for AssistantSchedule {
    const COLLECTION: Collection = Collection::AssistantSchedules;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        // Singleton; the customer is the only meaningful name.
        &self.customer_id
    }
}

impl AssistantSchedule {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.frequency.trim().eq_ignore_ascii_case(FREQUENCY_DAYS) {
            return Err(CoreError::InvalidField {
                field: "frequency".into(),
                reason: format!("only {FREQUENCY_DAYS:?} is supported, got {:?}", self.frequency),
            });
        }
        let interval = self.frequency_interval.trim();
        if !FREQUENCY_INTERVALS.contains(&interval) {
            return Err(CoreError::InvalidField {
                field: "frequency_interval".into(),
                reason: format!(
                    "must be one of {}, got {interval:?}",
                    FREQUENCY_INTERVALS.join(", ")
                ),
            });
        }
        Ok(())
    }
}
