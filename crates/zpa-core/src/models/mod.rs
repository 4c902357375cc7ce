/// Implements [`crate::Entity`] for a model with `id` and `name` fields.
macro_rules! entity {
    ($ty:ty, $collection:expr) => {
        impl $crate::entity::Entity for $ty {
            const COLLECTION: $crate::entity::Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}
pub(crate) use entity;

pub mod app_segment_pra;
pub mod application_segment;
pub mod policy;
pub mod pra_console;
pub mod pra_credential;
pub mod schedule;
pub mod segment_group;
pub mod server_group;
pub mod weighted_lb;

pub use app_segment_pra::{AppSegmentPra, AppsConfig, CommonAppsDto, PraApp};
pub use application_segment::ApplicationSegment;
pub use policy::{Condition, Operand, PolicyRule, PolicySet};
pub use pra_console::PraConsole;
pub use pra_credential::PraCredential;
pub use schedule::AssistantSchedule;
pub use segment_group::{SegmentGroup, SegmentGroupApplication};
pub use server_group::ServerGroup;
pub use weighted_lb::{ServerGroupMapping, WeightedLbConfig};


use serde::{Deserialize, Serialize};

/// `{"id": "..."}` reference embedded in another entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl IdRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }
}
