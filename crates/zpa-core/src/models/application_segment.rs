use serde::{Deserialize, Serialize};

use super::{IdRef, entity};
use crate::entity::Collection;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSegment {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub domain_names: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub segment_group_id: String,
    pub server_groups: Vec<IdRef>,
    #[serde(rename = "microtenantId", skip_serializing_if = "Option::is_none")]
    pub microtenant_id: Option<String>,
}

entity!(ApplicationSegment, Collection::ApplicationSegments);
