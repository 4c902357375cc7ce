pub mod app_segment_pra;
pub mod assistant_schedule;
pub mod pra_console;
pub mod pra_credential;
pub mod redirection_rule;
pub mod segment_group;
pub mod server_group;
pub mod weighted_lb_config;

pub use app_segment_pra::{AppSegmentPraResource, AppSegmentPraState, CommonAppState};
pub use assistant_schedule::{AssistantScheduleResource, AssistantScheduleState};
pub use pra_console::{PraConsoleResource, PraConsoleState};
pub use pra_credential::{PraCredentialResource, PraCredentialState};
pub use redirection_rule::{RedirectionRuleResource, RedirectionRuleState};
pub use segment_group::{SegmentGroupResource, SegmentGroupState};
pub use server_group::{ServerGroupResource, ServerGroupState};
pub use weighted_lb_config::{
    ServerGroupMappingState, WeightedLbConfigResource, WeightedLbConfigState,
};

use zpa_client::{ClientError, Service};
use zpa_core::Entity;

use crate::error::ProvisionerError;
use crate::plan::Attr;

/// The service narrowed to a resource instance's microtenant, if it has one.
pub(crate) fn scoped(service: &Service, microtenant_id: &Attr<String>) -> Service {
    service.with_microtenant(microtenant_id.trimmed())
}

/// The id an instance's state must carry for read, update and delete.
pub(crate) fn state_id<'a>(kind: &str, id: &'a Attr<String>) -> Result<&'a str, ProvisionerError> {
    id.trimmed().ok_or_else(|| ProvisionerError::MissingIdentifier {
        kind: kind.to_string(),
    })
}

pub(crate) fn non_empty(value: &str) -> Attr<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Attr::Null
    } else {
        Attr::Known(trimmed.to_string())
    }
}

/// Map a NotFound-coded client error to [`ProvisionerError::NotFound`].
pub(crate) fn not_found_as(kind: &str, id: &str) -> impl FnOnce(ClientError) -> ProvisionerError {
    let kind = kind.to_string();
    let id = id.to_string();
    move |err| {
        if err.is_not_found() {
            ProvisionerError::NotFound { kind, id }
        } else {
            err.into()
        }
    }
}

/// Resolve an import identifier: all-digit strings are ids, anything else
/// is looked up by name.
pub(crate) async fn lookup_for_import<T: Entity>(
    service: &Service,
    raw: &str,
) -> Result<T, ProvisionerError> {
    let raw = raw.trim();
    let kind = T::COLLECTION.label();
    if raw.is_empty() {
        return Err(ProvisionerError::MissingIdentifier {
            kind: kind.to_string(),
        });
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return service.get::<T>(raw).await.map_err(not_found_as(kind, raw));
    }

    service.get_by_name::<T>(raw).await.map_err(|err| {
        if err.is_not_found() {
            ProvisionerError::LookupNotFound {
                kind: kind.to_string(),
                name: raw.to_string(),
            }
        } else {
            err.into()
        }
    })
}
