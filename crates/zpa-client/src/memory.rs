//! In-memory management API.
//!
//! Behaves like the real service for the calls this workspace makes:
//! numeric-string ids, per-scope isolation, singleton collections, write-only
//! credential fields, and PRA sub-app materialization from submitted
//! `commonAppsDto` configs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Value, json};
use zpa_core::models::{CommonAppsDto, PraApp, PraCredential};
use zpa_core::{Collection, Scope, paths};

use crate::error::ClientError;
use crate::transport::{BoxFuture, Method, Request, Response, Transport};

const FIRST_ID: u64 = 216_196_257_331_370_000;

pub struct MemoryTransport {
    customer_id: String,
    latency: Option<Duration>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// (collection path, scope) -> id -> stored JSON.
    collections: HashMap<(String, Scope), BTreeMap<String, Value>>,
    next_id: u64,
    rejected_updates: HashSet<String>,
    calls: HashMap<Method, usize>,
}

impl MemoryTransport {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            latency: None,
            inner: Mutex::new(Inner {
                next_id: FIRST_ID,
                ..Inner::default()
            }),
        }
    }

    /// Delay every call, letting concurrent callers interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Make every future PUT to this id fail with a server error.
    pub fn reject_updates_for(&self, id: impl Into<String>) {
        self.lock().rejected_updates.insert(id.into());
    }

    /// Number of calls received with this method.
    pub fn calls(&self, method: Method) -> usize {
        self.lock().calls.get(&method).copied().unwrap_or(0)
    }

    /// Number of stored entities in a collection for a scope.
    pub fn count(&self, collection: Collection, scope: &Scope) -> usize {
        let path = paths::collection(&self.customer_id, collection);
        self.lock()
            .collections
            .get(&(path, scope.clone()))
            .map_or(0, BTreeMap::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle(&self, request: Request) -> Result<Response, ClientError> {
        let Request {
            method,
            path,
            scope,
            body,
        } = request;

        let mut inner = self.lock();
        *inner.calls.entry(method).or_default() += 1;

        let collection = paths::parse_collection(&self.customer_id, &path)
            .ok_or_else(|| ClientError::not_found(&path, "unknown endpoint"))?;
        let collection_path = paths::collection(&self.customer_id, collection);
        let item_id = path
            .strip_prefix(&collection_path)
            .map(|rest| rest.trim_matches('/'))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        let key = (collection_path.clone(), scope);

        match (method, item_id) {
            (Method::Get, None) => {
                let list: Vec<Value> = inner
                    .collections
                    .get(&key)
                    .map(|items| items.values().map(|v| redact(collection, v)).collect())
                    .unwrap_or_default();
                Ok(ok(json!({ "totalPages": "1", "list": list })))
            }
            (Method::Get, Some(id)) => inner
                .collections
                .get(&key)
                .and_then(|items| items.get(&id))
                .map(|v| ok(redact(collection, v)))
                .ok_or_else(|| not_found(&path, collection, &id)),
            (Method::Post, None) => {
                let mut body = body.unwrap_or(Value::Null);
                if !body.is_object() {
                    return Err(bad_request(&path, "request body must be an object"));
                }
                if collection.is_singleton()
                    && inner.collections.get(&key).is_some_and(|items| !items.is_empty())
                {
                    return Err(ClientError::already_exists(
                        &path,
                        format!("{} already exists for this customer", collection.label()),
                    ));
                }

                let id = inner.mint_id();
                let now = jiff::Timestamp::now().as_second().to_string();
                body["id"] = Value::String(id.clone());
                body["creationTime"] = Value::String(now.clone());
                body["modifiedTime"] = Value::String(now);
                if collection == Collection::PraApplicationSegments {
                    inner.materialize_pra(&mut body, None)?;
                }

                let stored = redact(collection, &body);
                inner.collections.entry(key).or_default().insert(id, body);
                Ok(Response {
                    status: 201,
                    body: stored,
                })
            }
            (Method::Put, Some(id)) => {
                if inner.rejected_updates.contains(&id) {
                    return Err(ClientError::from_response(
                        500,
                        &path,
                        br#"{"id":"internal.error","reason":"update rejected"}"#,
                    ));
                }
                let mut body = body.unwrap_or(Value::Null);
                if !body.is_object() {
                    return Err(bad_request(&path, "request body must be an object"));
                }

                let previous = inner
                    .collections
                    .get(&key)
                    .and_then(|items| items.get(&id))
                    .cloned();
                // Weighted LB configs hang off an application and always exist.
                if previous.is_none() && collection != Collection::WeightedLbConfigs {
                    return Err(not_found(&path, collection, &id));
                }

                if collection != Collection::WeightedLbConfigs {
                    body["id"] = Value::String(id.clone());
                }
                if let Some(created) = previous.as_ref().and_then(|p| p.get("creationTime")) {
                    body["creationTime"] = created.clone();
                }
                let now = jiff::Timestamp::now().as_second();
                body["modifiedTime"] = Value::String(now.to_string());
                if collection == Collection::PraApplicationSegments {
                    inner.materialize_pra(&mut body, previous.as_ref())?;
                }

                inner.collections.entry(key).or_default().insert(id, body);
                Ok(Response {
                    status: 204,
                    body: Value::Null,
                })
            }
            (Method::Delete, Some(id)) => {
                let removed = inner
                    .collections
                    .get_mut(&key)
                    .and_then(|items| items.remove(&id));
                match removed {
                    Some(_) => Ok(Response {
                        status: 204,
                        body: Value::Null,
                    }),
                    None => Err(not_found(&path, collection, &id)),
                }
            }
            (method, _) => Err(ClientError::from_response(
                405,
                &path,
                format!(r#"{{"id":"method.not.allowed","reason":"{method} not supported here"}}"#)
                    .as_bytes(),
            )),
        }
    }
}

impl Transport for MemoryTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.handle(request)
        })
    }
}

impl Inner {
    fn mint_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Turn submitted `commonAppsDto` into stored `praApps`, the way the
    /// service does: configs update the sub-app with the same domain (or
    /// explicit `praAppId`), unknown domains get fresh ids, and ids listed in
    /// `deletedPraApps` are dropped. Without a dto the previous sub-apps stay.
    fn materialize_pra(
        &mut self,
        body: &mut Value,
        previous: Option<&Value>,
    ) -> Result<(), ClientError> {
        let mut apps: Vec<PraApp> = match previous.and_then(|prev| prev.get("praApps")) {
            Some(stored) => serde_json::from_value(stored.clone())?,
            None => Vec::new(),
        };

        let fields = body
            .as_object_mut()
            .ok_or_else(|| ClientError::Transport("PRA body must be an object".into()))?;
        if let Some(dto) = fields.remove("commonAppsDto") {
            let dto: CommonAppsDto = serde_json::from_value(dto)?;
            apps.retain(|app| !dto.deleted_pra_apps.contains(&app.id));
            for config in &dto.apps_config {
                let existing = apps.iter_mut().find(|app| {
                    (!config.pra_app_id.is_empty() && app.id == config.pra_app_id)
                        || app.domain.eq_ignore_ascii_case(config.domain.trim())
                });
                match existing {
                    Some(app) => {
                        *app = PraApp::from_config(config, app.id.clone(), app.app_id.clone());
                    }
                    None => {
                        let id = self.mint_id();
                        let app_id = self.mint_id();
                        apps.push(PraApp::from_config(config, id, app_id));
                    }
                }
            }
        }

        fields.insert("praApps".into(), serde_json::to_value(&apps)?);
        Ok(())
    }
}

fn ok(body: Value) -> Response {
    Response { status: 200, body }
}

fn not_found(path: &str, collection: Collection, id: &str) -> ClientError {
    ClientError::not_found(path, format!("{} {id} not found", collection.label()))
}

fn bad_request(path: &str, reason: &str) -> ClientError {
    ClientError::from_response(
        400,
        path,
        json!({ "id": "invalid.request", "reason": reason }).to_string().as_bytes(),
    )
}

/// Strip fields the service accepts but never returns.
fn redact(collection: Collection, value: &Value) -> Value {
    let mut value = value.clone();
    if collection == Collection::PraCredentials {
        if let Some(fields) = value.as_object_mut() {
            for field in PraCredential::WRITE_ONLY_FIELDS {
                fields.remove(field);
            }
        }
    }
    value
}
