use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error code carried in the API error body's `id` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    AlreadyExists,
    Other(String),
}

impl ErrorCode {
    pub const NOT_FOUND: &'static str = "resource.not.found";
    pub const ALREADY_EXISTS: &'static str = "resource.already.exist";

    pub fn parse(code: &str) -> Self {
        match code.trim() {
            Self::NOT_FOUND => Self::NotFound,
            Self::ALREADY_EXISTS => Self::AlreadyExists,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NotFound => Self::NOT_FOUND,
            Self::AlreadyExists => Self::ALREADY_EXISTS,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload returned by the management API, e.g.
/// `{"id": "resource.already.exist", "reason": "..."}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{path} returned {status} ({code}): {reason}")]
    Api {
        status: u16,
        path: String,
        code: ErrorCode,
        reason: String,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Classify a non-success response by its error body.
    ///
    /// A body without a recognizable code falls back to the status: 404 is
    /// NotFound, anything else keeps the raw text as the reason.
    pub fn from_response(status: u16, path: &str, body: &[u8]) -> Self {
        let (code, reason) = match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(parsed) if !parsed.id.is_empty() => (ErrorCode::parse(&parsed.id), parsed.reason),
            _ => {
                let text = String::from_utf8_lossy(body).into_owned();
                let code = if status == 404 {
                    ErrorCode::NotFound
                } else {
                    ErrorCode::Other(String::new())
                };
                (code, text)
            }
        };
        Self::Api {
            status,
            path: path.to_string(),
            code,
            reason,
        }
    }

    pub fn not_found(path: &str, reason: impl Into<String>) -> Self {
        Self::Api {
            status: 404,
            path: path.to_string(),
            code: ErrorCode::NotFound,
            reason: reason.into(),
        }
    }

    pub fn already_exists(path: &str, reason: impl Into<String>) -> Self {
        Self::Api {
            status: 409,
            path: path.to_string(),
            code: ErrorCode::AlreadyExists,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(&ErrorCode::NotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        self.code() == Some(&ErrorCode::AlreadyExists)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
