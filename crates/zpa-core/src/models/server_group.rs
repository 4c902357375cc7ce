use serde::{Deserialize, Serialize};

use super::{IdRef, entity};
use crate::entity::Collection;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerGroup {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub enabled: bool,
    pub dynamic_discovery: bool,
    pub app_connector_groups: Vec<IdRef>,
    pub applications: Vec<IdRef>,
    #[serde(rename = "microtenantId", skip_serializing_if = "Option::is_none")]
    pub microtenant_id: Option<String>,
}

entity!(ServerGroup, Collection::ServerGroups);
