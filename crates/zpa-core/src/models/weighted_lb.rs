use serde::{Deserialize, Serialize};

/// Weighted load balancing for one application segment, addressed by the
/// application id rather than an id of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightedLbConfig {
    pub application_id: String,
    pub weighted_load_balancing: bool,
    pub application_to_server_group_maps: Vec<ServerGroupMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerGroupMapping {
    pub id: String,
    pub name: String,
    pub passive: bool,
    pub weight: String,
}
