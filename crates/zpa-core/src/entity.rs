use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A remote collection addressed by the management API.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    ApplicationSegments,
    PraApplicationSegments,
    SegmentGroups,
    ServerGroups,
    PraCredentials,
    PraConsoles,
    PolicySets,
    PolicyRules(PolicyType),
    AssistantSchedules,
    WeightedLbConfigs,
}

impl Collection {
    /// Human label used in diagnostics, e.g. "segment group".
    pub fn label(&self) -> &'static str {
        match self {
            Self::ApplicationSegments => "application segment",
            Self::PraApplicationSegments => "PRA application segment",
            Self::SegmentGroups => "segment group",
            Self::ServerGroups => "server group",
            Self::PraCredentials => "PRA credential",
            Self::PraConsoles => "PRA console",
            Self::PolicySets => "policy set",
            Self::PolicyRules(_) => "policy rule",
            Self::AssistantSchedules => "assistant schedule",
            Self::WeightedLbConfigs => "weighted load balancer config",
        }
    }

    /// At most one entity of this collection exists per tenant.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::AssistantSchedules)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PolicyRules(t) => write!(f, "policy rule ({t})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Policy rule families. Each family is its own referencing collection.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    AccessPolicy,
    TimeoutPolicy,
    SiemPolicy,
    ClientForwardingPolicy,
    InspectionPolicy,
    CredentialPolicy,
    RedirectionPolicy,
    PrivilegedPortalPolicy,
}

impl PolicyType {
    pub const ALL: [PolicyType; 8] = [
        Self::AccessPolicy,
        Self::TimeoutPolicy,
        Self::SiemPolicy,
        Self::ClientForwardingPolicy,
        Self::InspectionPolicy,
        Self::CredentialPolicy,
        Self::RedirectionPolicy,
        Self::PrivilegedPortalPolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessPolicy => "ACCESS_POLICY",
            Self::TimeoutPolicy => "TIMEOUT_POLICY",
            Self::SiemPolicy => "SIEM_POLICY",
            Self::ClientForwardingPolicy => "CLIENT_FORWARDING_POLICY",
            Self::InspectionPolicy => "INSPECTION_POLICY",
            Self::CredentialPolicy => "CREDENTIAL_POLICY",
            Self::RedirectionPolicy => "REDIRECTION_POLICY",
            Self::PrivilegedPortalPolicy => "PRIVILEGED_PORTAL_POLICY",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::InvalidField {
                field: "policy_type".into(),
                reason: format!("unknown policy type {wanted:?}"),
            })
    }
}

/// A remote object that lives in exactly one collection and carries a
/// server-assigned id and a user-facing name.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn name(&self) -> &str;
}
