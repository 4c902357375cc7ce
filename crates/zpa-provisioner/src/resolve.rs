use std::future::Future;

use zpa_client::{ClientError, Service};
use zpa_core::Entity;

use crate::error::ProvisionerError;

/// A reference resolved to a canonical id. `name` is filled only when a
/// lookup ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: String,
    pub name: Option<String>,
}

/// Resolve an id-or-name reference.
///
/// A non-blank id wins and is returned unchanged without any call. Otherwise
/// a non-blank name is looked up; a lookup that finds nothing becomes
/// [`ProvisionerError::LookupNotFound`], any other lookup failure is passed
/// through. With neither, the configuration is missing an identifier.
pub async fn resolve_identity<F, Fut>(
    kind: &str,
    id: Option<&str>,
    name: Option<&str>,
    lookup: F,
) -> Result<Resolved, ProvisionerError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<(String, String), ClientError>>,
{
    if let Some(id) = id.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(Resolved {
            id: id.to_string(),
            name: None,
        });
    }

    let Some(name) = name.map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(ProvisionerError::MissingIdentifier {
            kind: kind.to_string(),
        });
    };

    tracing::debug!(kind, name, "resolving reference by name");
    match lookup(name.to_string()).await {
        Ok((id, found)) => Ok(Resolved {
            id,
            name: Some(found),
        }),
        Err(e) if e.is_not_found() => Err(ProvisionerError::LookupNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// [`resolve_identity`] against an entity collection, looking names up with
/// [`Service::get_by_name`].
pub async fn resolve_entity<T: Entity>(
    service: &Service,
    id: Option<&str>,
    name: Option<&str>,
) -> Result<Resolved, ProvisionerError> {
    resolve_identity(T::COLLECTION.label(), id, name, |name| async move {
        let found = service.get_by_name::<T>(&name).await?;
        Ok((found.id().to_string(), found.name().to_string()))
    })
    .await
}
