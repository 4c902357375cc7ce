//! Management API path conventions.
//!
//! Pure string functions with no transport dependency. These define where each
//! collection lives under a customer.

use crate::entity::{Collection, PolicyType};

pub const MGMT_CONFIG: &str = "/mgmtconfig/v1/admin/customers";

pub fn customer_root(customer_id: &str) -> String {
    format!("{MGMT_CONFIG}/{customer_id}")
}

pub fn collection(customer_id: &str, collection: Collection) -> String {
    let root = customer_root(customer_id);
    match collection {
        Collection::ApplicationSegments => format!("{root}/application"),
        Collection::PraApplicationSegments => format!("{root}/application/pra"),
        Collection::SegmentGroups => format!("{root}/segmentGroup"),
        Collection::ServerGroups => format!("{root}/serverGroup"),
        Collection::PraCredentials => format!("{root}/credential"),
        Collection::PraConsoles => format!("{root}/praConsole"),
        Collection::PolicySets => format!("{root}/policySet"),
        Collection::PolicyRules(t) => policy_rules(customer_id, t),
        Collection::AssistantSchedules => format!("{root}/assistantSchedule"),
        Collection::WeightedLbConfigs => format!("{root}/application/weightedLbConfig"),
    }
}

pub fn item(customer_id: &str, collection_: Collection, id: &str) -> String {
    format!("{}/{id}", collection(customer_id, collection_))
}

pub fn policy_rules(customer_id: &str, policy_type: PolicyType) -> String {
    format!(
        "{}/policySet/rules/policyType/{policy_type}",
        customer_root(customer_id)
    )
}

/// Recover the collection a path addresses. Inverse of [`collection`].
pub fn parse_collection(customer_id: &str, path: &str) -> Option<Collection> {
    let root = customer_root(customer_id);
    let rest = path.strip_prefix(&root)?.trim_start_matches('/');

    if let Some(kind) = rest.strip_prefix("policySet/rules/policyType/") {
        let kind = kind.split('/').next()?;
        return kind.parse().ok().map(Collection::PolicyRules);
    }

    // Longest prefixes first: "application/pra" must win over "application".
    const FIXED: [(&str, Collection); 9] = [
        ("application/weightedLbConfig", Collection::WeightedLbConfigs),
        ("application/pra", Collection::PraApplicationSegments),
        ("application", Collection::ApplicationSegments),
        ("segmentGroup", Collection::SegmentGroups),
        ("serverGroup", Collection::ServerGroups),
        ("credential", Collection::PraCredentials),
        ("praConsole", Collection::PraConsoles),
        ("policySet", Collection::PolicySets),
        ("assistantSchedule", Collection::AssistantSchedules),
    ];
    FIXED
        .iter()
        .find(|(prefix, _)| rest == *prefix || rest.starts_with(&format!("{prefix}/")))
        .map(|(_, c)| *c)
}
