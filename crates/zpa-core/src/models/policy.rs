use serde::{Deserialize, Serialize};

use super::{IdRef, entity};
use crate::entity::{Collection, PolicyType};

/// Container of every rule of one policy type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySet {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub policy_type: Option<PolicyType>,
}

entity!(PolicySet, Collection::PolicySets);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRule {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    pub policy_set_id: String,
    pub policy_type: Option<PolicyType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rule_order: String,
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub app_server_groups: Vec<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service_edge_groups: Vec<IdRef>,
    #[serde(rename = "microtenantId", skip_serializing_if = "Option::is_none")]
    pub microtenant_id: Option<String>,
}

impl PolicyRule {
    /// Every operand across all conditions.
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.conditions.iter().flat_map(|c| c.operands.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub negated: bool,
    pub operator: String,
    pub operands: Vec<Operand>,
}

/// A single criterion. When `lhs` is `"id"`, `rhs` names another entity by
/// id and the operand is a reference to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operand {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub idp_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub object_type: String,
    pub lhs: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rhs: String,
    /// Multi-valued form used by newer rule payloads.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl Operand {
    pub fn id_ref(object_type: &str, id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.to_string(),
            lhs: "id".to_string(),
            rhs: id.into(),
            ..Self::default()
        }
    }

    /// True when this operand points at `id` as an entity of `object_type`,
    /// either through `rhs` or through `values`.
    pub fn references(&self, object_type: &str, id: &str) -> bool {
        self.object_type.eq_ignore_ascii_case(object_type)
            && self.lhs.eq_ignore_ascii_case("id")
            && (self.rhs == id || self.values.iter().any(|v| v == id))
    }
}
