mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use zpa_client::Service;
use zpa_core::PolicyType;
use zpa_core::models::{IdRef, Operand, PolicyRule};
use zpa_provisioner::prune::detach;
use zpa_provisioner::{LockRegistry, PruneFailurePolicy, Pruner, ProvisionerError, ReferenceKind};

async fn add_rule(service: &Service, policy_type: PolicyType, rule: PolicyRule) -> String {
    service.create_rule(policy_type, &rule).await.unwrap().id
}

async fn fetch_rule(service: &Service, policy_type: PolicyType, id: &str) -> PolicyRule {
    service.get_rule(policy_type, id).await.unwrap()
}

fn referenced(rule: &PolicyRule, object_type: &str, id: &str) -> bool {
    rule.operands().any(|op| op.references(object_type, id))
}

#[test]
fn detach_drops_only_the_matching_operand() {
    let mut rule = common::rule(
        "r",
        "1",
        vec![
            Operand::id_ref("APP", "10"),
            Operand::id_ref("APP", "11"),
            Operand::id_ref("APP_GROUP", "10"),
        ],
    );

    assert!(detach(&mut rule, ReferenceKind::App, "10"));
    let left: Vec<(&str, &str)> = rule
        .operands()
        .map(|op| (op.object_type.as_str(), op.rhs.as_str()))
        .collect();
    assert_eq!(left, [("APP", "11"), ("APP_GROUP", "10")]);
    assert!(!detach(&mut rule, ReferenceKind::App, "10"));
}

#[test]
fn detach_removes_one_value_from_a_multi_valued_operand() {
    let mut rule = common::rule("r", "1", vec![common::values_operand("APP_GROUP", &["1", "2"])]);

    assert!(detach(&mut rule, ReferenceKind::AppGroup, "1"));
    assert_eq!(rule.conditions[0].operands[0].values, ["2"]);

    assert!(detach(&mut rule, ReferenceKind::AppGroup, "2"));
    assert!(rule.conditions.is_empty());
}

#[test]
fn detach_ignores_non_id_operands() {
    let mut rule = common::rule(
        "r",
        "1",
        vec![Operand {
            object_type: "APP".into(),
            lhs: "name".into(),
            rhs: "10".into(),
            ..Operand::default()
        }],
    );
    assert!(!detach(&mut rule, ReferenceKind::App, "10"));
    assert_eq!(rule.operands().count(), 1);
}

#[test]
fn detach_server_group_edits_app_server_groups() {
    let mut rule = PolicyRule {
        app_server_groups: vec![IdRef::new("5"), IdRef::new("6")],
        ..common::rule("r", "1", vec![Operand::id_ref("APP", "5")])
    };

    assert!(detach(&mut rule, ReferenceKind::ServerGroup, "5"));
    assert_eq!(rule.app_server_groups, [IdRef::new("6")]);
    assert_eq!(rule.operands().count(), 1);
}

#[tokio::test]
async fn prune_clears_every_reference_and_keeps_unrelated_operands() {
    let (_, service) = common::backend();
    let types = [PolicyType::AccessPolicy, PolicyType::TimeoutPolicy];
    let sets = common::seed_policy_sets(&service, &types).await;

    let first = add_rule(
        &service,
        PolicyType::AccessPolicy,
        common::rule(
            "first",
            &sets[0],
            vec![Operand::id_ref("APP", "900"), Operand::id_ref("APP", "901")],
        ),
    )
    .await;
    let second = add_rule(
        &service,
        PolicyType::TimeoutPolicy,
        common::rule(
            "second",
            &sets[1],
            vec![Operand::id_ref("APP_GROUP", "77"), Operand::id_ref("APP", "900")],
        ),
    )
    .await;

    let report = Pruner::new(service.clone())
        .with_locks(Arc::new(LockRegistry::new()))
        .prune("900", ReferenceKind::App)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.scanned, 2);
    assert_eq!(report.updated.len(), 2);

    let first = fetch_rule(&service, PolicyType::AccessPolicy, &first).await;
    let second = fetch_rule(&service, PolicyType::TimeoutPolicy, &second).await;
    assert!(!referenced(&first, "APP", "900"));
    assert!(!referenced(&second, "APP", "900"));
    assert!(referenced(&first, "APP", "901"));
    assert!(referenced(&second, "APP_GROUP", "77"));
}

#[tokio::test]
async fn untouched_rules_are_not_written() {
    let (transport, service) = common::backend();
    let sets = common::seed_policy_sets(&service, &[PolicyType::AccessPolicy]).await;
    add_rule(
        &service,
        PolicyType::AccessPolicy,
        common::rule("other", &sets[0], vec![Operand::id_ref("APP", "1")]),
    )
    .await;

    let report = Pruner::new(service)
        .prune_in("2", ReferenceKind::App, &[PolicyType::AccessPolicy])
        .await
        .unwrap();
    assert_eq!(report.scanned, 1);
    assert!(report.updated.is_empty());
    assert_eq!(transport.calls(zpa_client::Method::Put), 0);
}

#[tokio::test]
async fn missing_policy_set_id_is_filled_before_update() {
    let (_, service) = common::backend();
    let sets = common::seed_policy_sets(&service, &[PolicyType::CredentialPolicy]).await;
    let rule_id = add_rule(
        &service,
        PolicyType::CredentialPolicy,
        common::rule(
            "creds",
            "",
            vec![Operand::id_ref("CREDENTIAL", "31"), Operand::id_ref("APP", "1")],
        ),
    )
    .await;

    Pruner::new(service.clone())
        .prune("31", ReferenceKind::Credential)
        .await
        .unwrap();

    let rule = fetch_rule(&service, PolicyType::CredentialPolicy, &rule_id).await;
    assert_eq!(rule.policy_set_id, sets[0]);
    assert!(!referenced(&rule, "CREDENTIAL", "31"));
}

#[tokio::test]
async fn unknown_policy_set_skips_only_the_rules_that_need_it() {
    let (_, service) = common::backend();
    let orphan = add_rule(
        &service,
        PolicyType::CredentialPolicy,
        common::rule("orphan", "", vec![Operand::id_ref("CREDENTIAL", "42")]),
    )
    .await;
    let placed = add_rule(
        &service,
        PolicyType::CredentialPolicy,
        common::rule(
            "placed",
            "99",
            vec![Operand::id_ref("CREDENTIAL", "42"), Operand::id_ref("APP", "1")],
        ),
    )
    .await;

    let report = Pruner::new(service.clone())
        .prune("42", ReferenceKind::Credential)
        .await
        .unwrap();

    assert_eq!(report.updated, [placed.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].rule_id, orphan);

    let placed = fetch_rule(&service, PolicyType::CredentialPolicy, &placed).await;
    assert!(!referenced(&placed, "CREDENTIAL", "42"));
    let orphan = fetch_rule(&service, PolicyType::CredentialPolicy, &orphan).await;
    assert!(referenced(&orphan, "CREDENTIAL", "42"));
}

#[tokio::test]
async fn concurrent_prunes_on_one_collection_lose_no_edit() {
    let (_, service) = common::slow_backend(Duration::from_millis(15));
    let sets = common::seed_policy_sets(&service, &[PolicyType::AccessPolicy]).await;
    let rule_id = add_rule(
        &service,
        PolicyType::AccessPolicy,
        common::rule(
            "shared",
            &sets[0],
            vec![
                common::values_operand("APP_GROUP", &["100", "200"]),
                Operand::id_ref("APP_GROUP", "300"),
            ],
        ),
    )
    .await;

    let locks = Arc::new(LockRegistry::new());
    let a = Pruner::new(service.clone()).with_locks(locks.clone());
    let b = Pruner::new(service.clone()).with_locks(locks);
    let (ra, rb) = tokio::join!(
        a.prune_in("100", ReferenceKind::AppGroup, &[PolicyType::AccessPolicy]),
        b.prune_in("200", ReferenceKind::AppGroup, &[PolicyType::AccessPolicy]),
    );
    ra.unwrap();
    rb.unwrap();

    let rule = fetch_rule(&service, PolicyType::AccessPolicy, &rule_id).await;
    assert!(!referenced(&rule, "APP_GROUP", "100"));
    assert!(!referenced(&rule, "APP_GROUP", "200"));
    assert!(referenced(&rule, "APP_GROUP", "300"));
}

async fn two_referencing_rules(service: &Service) -> (String, String) {
    let sets = common::seed_policy_sets(service, &[PolicyType::AccessPolicy]).await;
    let mut ids = Vec::new();
    for name in ["one", "two"] {
        ids.push(
            add_rule(
                service,
                PolicyType::AccessPolicy,
                common::rule(
                    name,
                    &sets[0],
                    vec![Operand::id_ref("APP", "55"), Operand::id_ref("APP", "56")],
                ),
            )
            .await,
        );
    }
    (ids[0].clone(), ids[1].clone())
}

#[tokio::test]
async fn failed_rule_update_does_not_stop_the_rest() {
    let (transport, service) = common::backend();
    let (broken, healthy) = two_referencing_rules(&service).await;
    transport.reject_updates_for(broken.clone());

    let report = Pruner::new(service.clone())
        .prune_in("55", ReferenceKind::App, &[PolicyType::AccessPolicy])
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.updated, [healthy.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].rule_id, broken);

    let healthy = fetch_rule(&service, PolicyType::AccessPolicy, &healthy).await;
    assert!(!referenced(&healthy, "APP", "55"));
}

#[tokio::test]
async fn strict_policy_reports_incomplete_prune() {
    let (transport, service) = common::backend();
    let (broken, _) = two_referencing_rules(&service).await;
    transport.reject_updates_for(broken.clone());

    let err = Pruner::new(service)
        .with_failure_policy(PruneFailurePolicy::Strict)
        .prune_in("55", ReferenceKind::App, &[PolicyType::AccessPolicy])
        .await
        .unwrap_err();

    let ProvisionerError::PruneIncomplete { failed_rules, .. } = err else {
        panic!("expected PruneIncomplete, got {err:?}");
    };
    assert_eq!(failed_rules, [broken]);
}

#[tokio::test]
async fn cancelled_prune_aborts() {
    let (_, service) = common::backend();
    two_referencing_rules(&service).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = Pruner::new(service.with_cancellation(cancel))
        .prune("55", ReferenceKind::App)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn reference_kinds_map_to_their_rule_collections() {
    assert_eq!(ReferenceKind::App.policy_types().len(), 5);
    assert_eq!(ReferenceKind::ServerGroup.policy_types(), [PolicyType::AccessPolicy]);
    assert_eq!(ReferenceKind::Console.policy_types(), [PolicyType::CredentialPolicy]);
    assert_eq!(ReferenceKind::AppGroup.to_string(), "APP_GROUP");
}
