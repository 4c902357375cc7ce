use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use zpa_core::Scope;

use crate::error::ClientError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// One management API call.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub scope: Scope,
    pub body: Option<Value>,
}

/// Status plus decoded body. `body` is `Value::Null` when the call returns
/// nothing (updates and deletes).
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

/// Opaque RPC boundary to the management API.
///
/// Implementations map non-success responses to [`ClientError`] via
/// [`ClientError::from_response`] so callers can branch on the error code.
/// Returns a boxed future for dyn compatibility.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>>;
}
