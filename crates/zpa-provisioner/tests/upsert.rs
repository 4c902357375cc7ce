mod common;

use tokio_util::sync::CancellationToken;
use zpa_client::Method;
use zpa_core::models::AssistantSchedule;
use zpa_core::{Collection, Scope};
use zpa_provisioner::{Upserted, create_or_adopt};

fn schedule(interval: &str) -> AssistantSchedule {
    AssistantSchedule {
        customer_id: common::CUSTOMER.into(),
        enabled: true,
        delete_disabled: true,
        frequency: "days".into(),
        frequency_interval: interval.into(),
        ..AssistantSchedule::default()
    }
}

#[tokio::test]
async fn fresh_backend_creates() {
    let (transport, service) = common::backend();

    let upserted = create_or_adopt(&service, &schedule("5")).await.unwrap();
    assert!(!upserted.was_adopted());
    assert!(!upserted.entity().id.is_empty());
    assert_eq!(transport.calls(Method::Put), 0);
}

#[tokio::test]
async fn existing_singleton_is_adopted_and_updated() {
    let (transport, service) = common::backend();
    let existing = service.create_schedule(&schedule("5")).await.unwrap();

    let upserted = create_or_adopt(&service, &schedule("30")).await.unwrap();
    let Upserted::Adopted(adopted) = upserted else {
        panic!("expected adoption");
    };

    assert_eq!(adopted.id, existing.id);
    assert_eq!(adopted.frequency_interval, "30");
    assert_eq!(transport.count(Collection::AssistantSchedules, &Scope::tenant()), 1);
}

#[tokio::test]
async fn second_call_updates_instead_of_creating_again() {
    let (transport, service) = common::backend();

    let first = create_or_adopt(&service, &schedule("7")).await.unwrap();
    let second = create_or_adopt(&service, &schedule("7")).await.unwrap();

    assert!(matches!(first, Upserted::Created(_)));
    assert!(second.was_adopted());
    assert_eq!(first.entity().id, second.entity().id);
    assert_eq!(transport.count(Collection::AssistantSchedules, &Scope::tenant()), 1);
    assert_eq!(transport.calls(Method::Put), 1);
}

#[tokio::test]
async fn other_create_errors_are_not_adopted() {
    let (transport, service) = common::backend();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = create_or_adopt(&service.with_cancellation(cancel), &schedule("7"))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(transport.calls(Method::Get), 0);
    assert_eq!(transport.calls(Method::Put), 0);
}
