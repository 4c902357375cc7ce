mod common;

use zpa_client::Service;
use zpa_core::PolicyType;
use zpa_core::models::{AppSegmentPra, Operand, SegmentGroup, SegmentGroupApplication};
use zpa_provisioner::resources::app_segment_pra::validate;
use zpa_provisioner::resources::{AppSegmentPraResource, AppSegmentPraState, CommonAppState};
use zpa_provisioner::{Attr, ManagedResource, ProvisionerError, ReadOutcome};

async fn segment_group(service: &Service) -> String {
    service
        .create(&SegmentGroup {
            name: "pra".into(),
            enabled: true,
            ..SegmentGroup::default()
        })
        .await
        .unwrap()
        .id
}

fn rdp(domain: &str) -> CommonAppState {
    CommonAppState {
        domain: domain.into(),
        name: Attr::Known(domain.into()),
        enabled: true,
        application_port: Attr::Known("3389".into()),
        application_protocol: Attr::Known("RDP".into()),
        connection_security: Attr::Known("ANY".into()),
        ..CommonAppState::default()
    }
}

fn ssh(domain: &str) -> CommonAppState {
    CommonAppState {
        domain: domain.into(),
        name: Attr::Known(domain.into()),
        enabled: true,
        application_port: Attr::Known("22".into()),
        application_protocol: Attr::Known("SSH".into()),
        ..CommonAppState::default()
    }
}

fn plan(group_id: &str, apps: Vec<CommonAppState>) -> AppSegmentPraState {
    AppSegmentPraState {
        name: "jump".into(),
        enabled: true,
        segment_group_id: group_id.into(),
        domain_names: apps.iter().map(|a| a.domain.clone()).collect(),
        tcp_port_ranges: vec!["22".into(), "22".into(), "3389".into(), "3389".into()],
        common_apps: apps,
        ..AppSegmentPraState::default()
    }
}

fn domains(state: &AppSegmentPraState) -> Vec<&str> {
    state.common_apps.iter().map(|a| a.domain.as_str()).collect()
}

#[tokio::test]
async fn create_assigns_sub_app_ids_in_plan_order() {
    let (_, service) = common::backend();
    let group = segment_group(&service).await;
    let resource = AppSegmentPraResource::new(service.clone(), &common::config());

    let state = resource
        .create(&plan(&group, vec![ssh("b.example.com"), rdp("a.example.com")]))
        .await
        .unwrap();

    assert!(state.id.is_known());
    assert_eq!(domains(&state), ["b.example.com", "a.example.com"]);
    assert_eq!(state.domain_names, ["b.example.com", "a.example.com"]);
    for app in &state.common_apps {
        assert!(app.pra_app_id.is_known(), "{} has no sub-app id", app.domain);
        assert!(app.app_id.is_known(), "{} has no application id", app.domain);
    }
}

#[tokio::test]
async fn update_deletes_dropped_domains_and_keeps_surviving_ids() {
    let (_, service) = common::backend();
    let group = segment_group(&service).await;
    let resource = AppSegmentPraResource::new(service.clone(), &common::config());

    let created = resource
        .create(&plan(&group, vec![rdp("a.example.com"), ssh("b.example.com")]))
        .await
        .unwrap();
    let kept_id = created.common_apps[0].pra_app_id.clone();

    let mut next = plan(&group, vec![rdp("a.example.com")]);
    next.domain_names = vec!["a.example.com".into(), "b.example.com".into()];
    let updated = resource.update(&next, &created).await.unwrap();

    assert_eq!(domains(&updated), ["a.example.com"]);
    assert_eq!(updated.common_apps[0].pra_app_id, kept_id);
    assert_eq!(updated.domain_names, ["a.example.com"]);

    let id = updated.id.known().unwrap();
    let remote: AppSegmentPra = service.get(id).await.unwrap();
    assert_eq!(remote.pra_apps.len(), 1);
    assert_eq!(remote.pra_apps[0].domain, "a.example.com");
}

#[tokio::test]
async fn reapplying_the_same_plan_is_stable() {
    let (_, service) = common::backend();
    let group = segment_group(&service).await;
    let resource = AppSegmentPraResource::new(service.clone(), &common::config());

    let desired = plan(&group, vec![rdp("a.example.com"), ssh("b.example.com")]);
    let created = resource.create(&desired).await.unwrap();
    let again = resource.update(&desired, &created).await.unwrap();

    assert_eq!(again.common_apps, created.common_apps);
}

#[test]
fn validation_reports_every_problem() {
    let mut bad_rdp = rdp("a.example.com");
    bad_rdp.connection_security = Attr::Null;
    let mut bad_ssh = ssh("stray.example.com");
    bad_ssh.connection_security = Attr::Known("ANY".into());

    let mut desired = plan("", vec![bad_rdp, bad_ssh]);
    desired.domain_names = vec!["a.example.com".into()];

    let diags = validate(&desired);
    let details: Vec<&str> = diags.errors().map(|d| d.detail.as_str()).collect();
    assert_eq!(details.len(), 4, "{details:?}");
    assert!(details.iter().any(|d| d.contains("segment_group_id")));
    assert!(details.iter().any(|d| d.contains("not defined in domain_names")));
    assert!(details.iter().any(|d| d.contains("must be set when application_protocol is RDP")));
    assert!(details.iter().any(|d| d.contains("can only be set")));
}

#[tokio::test]
async fn duplicate_domains_fail_before_any_call() {
    let (transport, service) = common::backend();
    let resource = AppSegmentPraResource::new(service, &common::config());

    let err = resource
        .create(&plan("1", vec![rdp("a.example.com"), rdp("A.example.com")]))
        .await
        .unwrap_err();

    assert!(matches!(err.root(), ProvisionerError::Validation(_)));
    assert_eq!(transport.calls(zpa_client::Method::Post), 0);
}

#[tokio::test]
async fn read_of_deleted_segment_removes_it_from_state() {
    let (_, service) = common::backend();
    let group = segment_group(&service).await;
    let resource = AppSegmentPraResource::new(service.clone(), &common::config());
    let state = resource.create(&plan(&group, vec![rdp("a.example.com")])).await.unwrap();

    service
        .delete::<AppSegmentPra>(state.id.known().unwrap())
        .await
        .unwrap();

    assert_eq!(resource.read(&state).await.unwrap(), ReadOutcome::Removed);
}

#[tokio::test]
async fn update_of_deleted_segment_is_an_error() {
    let (_, service) = common::backend();
    let group = segment_group(&service).await;
    let resource = AppSegmentPraResource::new(service.clone(), &common::config());
    let desired = plan(&group, vec![rdp("a.example.com")]);
    let state = resource.create(&desired).await.unwrap();
    service
        .delete::<AppSegmentPra>(state.id.known().unwrap())
        .await
        .unwrap();

    let err = resource.update(&desired, &state).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains(state.id.known().unwrap()));
}

#[tokio::test]
async fn delete_detaches_from_segment_group_and_policies() {
    let (_, service) = common::backend();
    let group_id = segment_group(&service).await;
    let resource = AppSegmentPraResource::new(service.clone(), &common::config());
    let state = resource
        .create(&plan(&group_id, vec![rdp("a.example.com")]))
        .await
        .unwrap();
    let id = state.id.known().unwrap().clone();

    let mut group: SegmentGroup = service.get(&group_id).await.unwrap();
    group.applications = vec![
        SegmentGroupApplication { id: id.clone() },
        SegmentGroupApplication { id: "other".into() },
    ];
    service.update(&group_id, &group).await.unwrap();

    let sets = common::seed_policy_sets(&service, &[PolicyType::AccessPolicy]).await;
    let rule = service
        .create_rule(
            PolicyType::AccessPolicy,
            &common::rule(
                "allow",
                &sets[0],
                vec![Operand::id_ref("APP", &id), Operand::id_ref("APP", "7")],
            ),
        )
        .await
        .unwrap();

    resource.delete(&state).await.unwrap();

    assert!(service.get::<AppSegmentPra>(&id).await.unwrap_err().is_not_found());
    let group: SegmentGroup = service.get(&group_id).await.unwrap();
    assert_eq!(group.applications, [SegmentGroupApplication { id: "other".into() }]);
    let rule = service.get_rule(PolicyType::AccessPolicy, &rule.id).await.unwrap();
    assert!(!rule.operands().any(|op| op.references("APP", &id)));
    assert!(rule.operands().any(|op| op.references("APP", "7")));

    // Deleting again is a no-op.
    resource.delete(&state).await.unwrap();
}

#[tokio::test]
async fn import_by_name_fills_computed_fields() {
    let (_, service) = common::backend();
    let group = segment_group(&service).await;
    let resource = AppSegmentPraResource::new(service.clone(), &common::config());
    let state = resource
        .create(&plan(&group, vec![rdp("a.example.com"), ssh("b.example.com")]))
        .await
        .unwrap();

    let imported = resource.import("JUMP").await.unwrap();
    assert_eq!(imported.id, state.id);
    assert_eq!(imported.common_apps.len(), 2);
    assert!(imported.common_apps.iter().all(|a| a.pra_app_id.is_known()));

    let by_id = resource.import(state.id.known().unwrap()).await.unwrap();
    assert_eq!(by_id.id, state.id);
}
