//! zpa-client
//!
//! The management API boundary. A dyn-compatible [`Transport`] carries raw
//! JSON requests; [`Service`] layers typed entity calls, tenant scoping and
//! cancellation on top. [`MemoryTransport`] is a self-contained backend.

pub mod error;
pub mod memory;
pub mod service;
pub mod transport;

pub use crate::error::{ApiErrorBody, ClientError, ErrorCode};
pub use crate::memory::MemoryTransport;
pub use crate::service::Service;
pub use crate::transport::{BoxFuture, Method, Request, Response, Transport};
