use thiserror::Error;
use zpa_client::ClientError;

use crate::diag::Diagnostics;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// A name lookup found nothing. Distinct from a failed lookup call.
    #[error("no {kind} named {name:?}")]
    LookupNotFound { kind: String, name: String },

    #[error("missing {kind} identifier: set either an id or a name")]
    MissingIdentifier { kind: String },

    #[error("invalid configuration: {0}")]
    Validation(Diagnostics),

    #[error("{kind} {id} is still referenced by policy rules: {}", failed_rules.join(", "))]
    PruneIncomplete {
        kind: String,
        id: String,
        failed_rules: Vec<String>,
    },

    #[error("{resource}: {inner}")]
    Resource {
        resource: String,
        inner: Box<ProvisionerError>,
    },

    #[error("API error: {0}")]
    Client(#[from] ClientError),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionerError {
    /// Prepend resource identity to the error message. Applied once; an
    /// error that already names its resource is returned unchanged.
    pub fn with_resource(self, label: &str, id: &str) -> Self {
        match self {
            already @ Self::Resource { .. } => already,
            other => Self::Resource {
                resource: if id.is_empty() {
                    label.to_string()
                } else {
                    format!("{label} ({id})")
                },
                inner: Box::new(other),
            },
        }
    }

    /// The error without any resource context.
    pub fn root(&self) -> &ProvisionerError {
        match self {
            Self::Resource { inner, .. } => inner.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self.root() {
            Self::NotFound { .. } => true,
            Self::Client(e) => e.is_not_found(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Client(e) if e.is_cancelled())
    }

    /// Short diagnostic title for the engine.
    pub fn summary(&self) -> &'static str {
        match self.root() {
            Self::NotFound { .. } => "Resource not found",
            Self::LookupNotFound { .. } => "Lookup failed",
            Self::MissingIdentifier { .. } => "Missing identifier",
            Self::Validation(_) => "Invalid configuration",
            Self::PruneIncomplete { .. } => "Reference cleanup incomplete",
            Self::Client(e) if e.is_cancelled() => "Operation cancelled",
            Self::Client(_) => "Client error",
            Self::Config(_) => "Provider configuration error",
            Self::Serialization(_) => "Serialization error",
            Self::Io(_) => "I/O error",
            Self::Resource { .. } => "Error",
        }
    }
}

impl From<zpa_core::CoreError> for ProvisionerError {
    fn from(err: zpa_core::CoreError) -> Self {
        let mut diags = Diagnostics::new();
        diags.error("Invalid attribute", err.to_string());
        Self::Validation(diags)
    }
}

/// Walk the full error chain and join all causes into one string.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
