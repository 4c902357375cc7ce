use serde_json::json;
use zpa_core::models::{AppSegmentPra, AssistantSchedule, Operand, PolicyRule};
use zpa_core::{Collection, PolicyType, Scope, paths};

#[test]
fn pra_segment_uses_wire_field_names() {
    let raw = json!({
        "id": "216196257331370181",
        "name": "pra",
        "enabled": true,
        "domainNames": ["rdp.example.com"],
        "praApps": [{
            "id": "216196257331370182",
            "appId": "216196257331370183",
            "name": "rdp",
            "domain": "rdp.example.com",
            "applicationPort": "3389",
            "applicationProtocol": "RDP",
            "connectionSecurity": "ANY"
        }],
        "microtenantId": "42"
    });

    let segment: AppSegmentPra = serde_json::from_value(raw).unwrap();
    assert_eq!(segment.domain_names, vec!["rdp.example.com"]);
    assert_eq!(segment.pra_apps.len(), 1);
    assert_eq!(segment.pra_apps[0].app_id, "216196257331370183");
    assert_eq!(segment.microtenant_id.as_deref(), Some("42"));
}

#[test]
fn empty_ids_are_not_sent_on_create() {
    let segment = AppSegmentPra {
        name: "new".into(),
        ..AppSegmentPra::default()
    };
    let body = serde_json::to_value(&segment).unwrap();
    assert!(body.get("id").is_none());
    assert!(body.get("praApps").is_none());
    assert!(body.get("microtenantId").is_none());
}

#[test]
fn policy_type_parses_case_insensitively() {
    let parsed: PolicyType = "credential_policy".parse().unwrap();
    assert_eq!(parsed, PolicyType::CredentialPolicy);
    assert!("NOT_A_POLICY".parse::<PolicyType>().is_err());
}

#[test]
fn policy_rule_operands_flatten_conditions() {
    let rule: PolicyRule = serde_json::from_value(json!({
        "id": "1",
        "name": "r",
        "policySetId": "ps",
        "policyType": "ACCESS_POLICY",
        "conditions": [
            {"operator": "OR", "operands": [{"objectType": "APP", "lhs": "id", "rhs": "10"}]},
            {"operator": "OR", "operands": [{"objectType": "APP_GROUP", "lhs": "ID", "rhs": "20"}]}
        ]
    }))
    .unwrap();

    assert_eq!(rule.operands().count(), 2);
    assert!(rule.operands().any(|o| o.references("APP_GROUP", "20")));
    assert!(!rule.operands().any(|o| o.references("APP", "20")));
    assert!(Operand::id_ref("APP", "10").references("APP", "10"));
}

#[test]
fn schedule_validation_limits_intervals() {
    let mut schedule = AssistantSchedule {
        enabled: true,
        frequency: "days".into(),
        frequency_interval: "5".into(),
        ..AssistantSchedule::default()
    };
    assert!(schedule.validate().is_ok());

    schedule.frequency_interval = "3".into();
    assert!(schedule.validate().is_err());

    schedule.frequency_interval = "7".into();
    schedule.frequency = "weeks".into();
    assert!(schedule.validate().is_err());
}

#[test]
fn blank_microtenant_means_parent_tenant() {
    assert_eq!(Scope::microtenant("   "), Scope::tenant());
    assert_eq!(Scope::microtenant(" 77 ").microtenant_id(), Some("77"));
    assert_eq!(Scope::from_optional(None), Scope::tenant());
}

#[test]
fn paths_round_trip_to_collections() {
    let customer = "216196257331281920";
    for collection in [
        Collection::ApplicationSegments,
        Collection::PraApplicationSegments,
        Collection::SegmentGroups,
        Collection::WeightedLbConfigs,
        Collection::AssistantSchedules,
        Collection::PolicyRules(PolicyType::TimeoutPolicy),
    ] {
        let path = paths::collection(customer, collection);
        assert_eq!(paths::parse_collection(customer, &path), Some(collection));
        let item = paths::item(customer, collection, "99");
        assert_eq!(paths::parse_collection(customer, &item), Some(collection));
    }
    assert_eq!(paths::parse_collection(customer, "/elsewhere"), None);
}
