use zpa_client::{BoxFuture, ClientError, Service};
use zpa_core::Entity;
use zpa_core::models::AssistantSchedule;

use crate::error::ProvisionerError;

/// An entity of which at most one exists per scope, so a conflicting create
/// can only mean "the one that exists".
pub trait Singleton: Entity {
    /// Fetch the existing instance in the service's scope.
    fn fetch_existing(service: &Service) -> BoxFuture<'_, Result<Self, ClientError>>;
}

impl Singleton for AssistantSchedule {
    fn fetch_existing(service: &Service) -> BoxFuture<'_, Result<Self, ClientError>> {
        Box::pin(service.get_schedule())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    Created(T),
    /// An existing instance was found and updated in place.
    Adopted(T),
}

impl<T> Upserted<T> {
    pub fn entity(&self) -> &T {
        match self {
            Self::Created(e) | Self::Adopted(e) => e,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Created(e) | Self::Adopted(e) => e,
        }
    }

    pub fn was_adopted(&self) -> bool {
        matches!(self, Self::Adopted(_))
    }
}

/// Create `payload`, or adopt the existing singleton when the service
/// reports it already exists.
///
/// Adoption fetches the existing instance, copies its id into the payload,
/// updates it, and reads it back. Only the `resource.already.exist` error
/// code triggers adoption; any other failure is returned unchanged.
pub async fn create_or_adopt<T: Singleton>(
    service: &Service,
    payload: &T,
) -> Result<Upserted<T>, ProvisionerError> {
    let err = match service.create(payload).await {
        Ok(created) => {
            tracing::info!(kind = %T::COLLECTION, entity_id = %created.id(), "created");
            return Ok(Upserted::Created(created));
        }
        Err(e) if e.is_already_exists() => e,
        Err(e) => return Err(e.into()),
    };

    tracing::info!(kind = %T::COLLECTION, reason = %err, "already exists, adopting");
    let existing = T::fetch_existing(service).await?;
    let id = existing.id().to_string();

    let mut payload = payload.clone();
    payload.set_id(id.clone());
    service.update(&id, &payload).await?;

    let adopted = service.get::<T>(&id).await?;
    tracing::info!(kind = %T::COLLECTION, entity_id = %id, "adopted existing instance");
    Ok(Upserted::Adopted(adopted))
}
