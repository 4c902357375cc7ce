use serde::{Deserialize, Serialize};

use super::{IdRef, entity};
use crate::entity::Collection;

pub const DEFAULT_APP_TYPE: &str = "SECURE_REMOTE_ACCESS";

/// Privileged remote access application segment.
///
/// `common_apps_dto` is what clients send; `pra_apps` is what the server
/// materializes, one sub-app per configured domain with its own id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSegmentPra {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub segment_group_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub segment_group_name: String,
    pub domain_names: Vec<String>,
    pub tcp_port_ranges: Vec<String>,
    pub udp_port_ranges: Vec<String>,
    pub server_groups: Vec<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_apps_dto: Option<CommonAppsDto>,
    #[serde(rename = "praApps", skip_serializing_if = "Vec::is_empty")]
    pub pra_apps: Vec<PraApp>,
    #[serde(rename = "microtenantId", skip_serializing_if = "Option::is_none")]
    pub microtenant_id: Option<String>,
}

entity!(AppSegmentPra, Collection::PraApplicationSegments);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonAppsDto {
    pub apps_config: Vec<AppsConfig>,
    /// Server sub-app ids to drop in the same update request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted_pra_apps: Vec<String>,
}

/// One client-declared sub-app, keyed by `domain`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppsConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(rename = "praAppId", skip_serializing_if = "String::is_empty")]
    pub pra_app_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub enabled: bool,
    pub app_types: Vec<String>,
    pub application_port: String,
    pub application_protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub connection_security: String,
    pub domain: String,
}

/// Server-side sub-app record returned on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PraApp {
    pub id: String,
    pub app_id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub domain: String,
    pub application_port: String,
    pub application_protocol: String,
    pub connection_security: String,
}

impl PraApp {
    /// The record a server would materialize for a submitted config.
    pub fn from_config(config: &AppsConfig, id: String, app_id: String) -> Self {
        Self {
            id,
            app_id,
            name: config.name.clone(),
            description: config.description.clone(),
            enabled: config.enabled,
            domain: config.domain.clone(),
            application_port: config.application_port.clone(),
            application_protocol: config.application_protocol.clone(),
            connection_security: config.connection_security.clone(),
        }
    }
}
