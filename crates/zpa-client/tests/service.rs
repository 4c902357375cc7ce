use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use zpa_client::{ClientError, ErrorCode, MemoryTransport, Method, Service};
use zpa_core::models::{
    AppSegmentPra, AppsConfig, AssistantSchedule, CommonAppsDto, PraCredential, SegmentGroup,
};
use zpa_core::{Collection, Entity, Scope};

const CUSTOMER: &str = "216196257331281920";

fn service() -> (Arc<MemoryTransport>, Service) {
    let transport = Arc::new(MemoryTransport::new(CUSTOMER));
    let service = Service::new(transport.clone(), CUSTOMER);
    (transport, service)
}

fn group(name: &str) -> SegmentGroup {
    SegmentGroup {
        name: name.into(),
        enabled: true,
        ..SegmentGroup::default()
    }
}

fn rdp_config(domain: &str) -> AppsConfig {
    AppsConfig {
        name: domain.into(),
        enabled: true,
        app_types: vec!["SECURE_REMOTE_ACCESS".into()],
        application_port: "3389".into(),
        application_protocol: "RDP".into(),
        connection_security: "ANY".into(),
        domain: domain.into(),
        ..AppsConfig::default()
    }
}

#[test]
fn error_body_code_is_classified() {
    let err = ClientError::from_response(
        409,
        "/x",
        br#"{"id":"resource.already.exist","reason":"dup"}"#,
    );
    assert!(err.is_already_exists());
    assert!(!err.is_not_found());

    let err = ClientError::from_response(404, "/x", b"gone");
    assert!(err.is_not_found());

    let err = ClientError::from_response(400, "/x", br#"{"id":"bad.thing"}"#);
    assert_eq!(err.code(), Some(&ErrorCode::Other("bad.thing".into())));
}

#[tokio::test]
async fn create_assigns_id_and_get_round_trips() {
    let (_, service) = service();
    let created = service.create(&group("web")).await.unwrap();
    assert!(!created.id().is_empty());

    let fetched: SegmentGroup = service.get(&created.id).await.unwrap();
    assert_eq!(fetched.name, "web");
}

#[tokio::test]
async fn get_missing_id_is_not_found() {
    let (_, service) = service();
    let err = service.get::<SegmentGroup>("404404").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn get_by_name_ignores_case() {
    let (_, service) = service();
    let created = service.create(&group("Web Apps")).await.unwrap();

    let found: SegmentGroup = service.get_by_name("web apps").await.unwrap();
    assert_eq!(found.id, created.id);

    let err = service.get_by_name::<SegmentGroup>("nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn microtenant_scope_isolates_entities() {
    let (transport, service) = service();
    let scoped = service.with_microtenant(Some("77"));
    scoped.create(&group("scoped")).await.unwrap();

    assert!(service.list::<SegmentGroup>().await.unwrap().is_empty());
    assert_eq!(scoped.list::<SegmentGroup>().await.unwrap().len(), 1);
    assert_eq!(
        transport.count(Collection::SegmentGroups, &Scope::microtenant("77")),
        1
    );
}

#[tokio::test]
async fn blank_microtenant_keeps_tenant_scope() {
    let (_, service) = service();
    assert_eq!(service.with_microtenant(Some("  ")).scope(), &Scope::tenant());
}

#[tokio::test]
async fn singleton_second_create_already_exists() {
    let (_, service) = service();
    let schedule = AssistantSchedule {
        customer_id: CUSTOMER.into(),
        enabled: true,
        frequency: "days".into(),
        frequency_interval: "5".into(),
        ..AssistantSchedule::default()
    };
    service.create_schedule(&schedule).await.unwrap();

    let err = service.create_schedule(&schedule).await.unwrap_err();
    assert!(err.is_already_exists());
    assert!(service.get_schedule().await.is_ok());
}

#[tokio::test]
async fn credential_secrets_are_never_returned() {
    let (_, service) = service();
    let created = service
        .create(&PraCredential {
            name: "admin".into(),
            credential_type: "USERNAME_PASSWORD".into(),
            user_name: "administrator".into(),
            password: "hunter2".into(),
            ..PraCredential::default()
        })
        .await
        .unwrap();
    assert!(created.password.is_empty());

    let fetched: PraCredential = service.get(&created.id).await.unwrap();
    assert_eq!(fetched.user_name, "administrator");
    assert!(fetched.password.is_empty());
}

#[tokio::test]
async fn pra_configs_materialize_into_sub_apps() {
    let (_, service) = service();
    let segment = AppSegmentPra {
        name: "pra".into(),
        domain_names: vec!["rdp.example.com".into(), "ssh.example.com".into()],
        common_apps_dto: Some(CommonAppsDto {
            apps_config: vec![rdp_config("rdp.example.com"), rdp_config("ssh.example.com")],
            deleted_pra_apps: vec![],
        }),
        ..AppSegmentPra::default()
    };
    let created = service.create(&segment).await.unwrap();
    assert_eq!(created.pra_apps.len(), 2);
    assert!(created.common_apps_dto.is_none());
    let rdp_id = created.pra_apps[0].id.clone();
    let ssh_id = created.pra_apps[1].id.clone();

    // Update keeps the id of a re-submitted domain and drops deleted ones.
    let mut update = segment.clone();
    update.common_apps_dto = Some(CommonAppsDto {
        apps_config: vec![rdp_config("RDP.example.com")],
        deleted_pra_apps: vec![ssh_id],
    });
    service.update(&created.id, &update).await.unwrap();

    let fetched: AppSegmentPra = service.get(&created.id).await.unwrap();
    assert_eq!(fetched.pra_apps.len(), 1);
    assert_eq!(fetched.pra_apps[0].id, rdp_id);
}

#[tokio::test]
async fn cancelled_token_stops_calls_before_sending() {
    let (transport, service) = service();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .with_cancellation(cancel)
        .list::<SegmentGroup>()
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(transport.calls(Method::Get), 0);
}

#[tokio::test]
async fn cancellation_interrupts_in_flight_call() {
    let transport = Arc::new(MemoryTransport::new(CUSTOMER).with_latency(Duration::from_secs(30)));
    let cancel = CancellationToken::new();
    let service = Service::new(transport, CUSTOMER).with_cancellation(cancel.clone());

    let call = tokio::spawn(async move { service.list::<SegmentGroup>().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = call.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn rejected_update_surfaces_server_error() {
    let (transport, service) = service();
    let created = service.create(&group("web")).await.unwrap();
    transport.reject_updates_for(created.id.clone());

    let err = service.update(&created.id, &created).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
}
