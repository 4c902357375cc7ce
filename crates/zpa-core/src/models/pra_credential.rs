use serde::{Deserialize, Serialize};

use super::entity;
use crate::entity::Collection;

/// Credential injected into privileged sessions.
///
/// `password`, `private_key` and `passphrase` are write-only: the server
/// accepts them but never returns them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PraCredential {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub credential_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_domain: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub passphrase: String,
    #[serde(rename = "microtenantId", skip_serializing_if = "Option::is_none")]
    pub microtenant_id: Option<String>,
}

entity!(PraCredential, Collection::PraCredentials);

impl PraCredential {
    pub const WRITE_ONLY_FIELDS: [&'static str; 3] = ["password", "privateKey", "passphrase"];
}
