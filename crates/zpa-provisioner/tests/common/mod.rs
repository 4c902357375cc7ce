#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use zpa_client::{MemoryTransport, Service};
use zpa_core::PolicyType;
use zpa_core::models::{Condition, Operand, PolicyRule, PolicySet};
use zpa_provisioner::ProviderConfig;

pub const CUSTOMER: &str = "216196257331281920";

/// Route `tracing` output through the test harness. `RUST_LOG` controls it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn backend() -> (Arc<MemoryTransport>, Service) {
    init_tracing();
    let transport = Arc::new(MemoryTransport::new(CUSTOMER));
    let service = Service::new(transport.clone(), CUSTOMER);
    (transport, service)
}

pub fn slow_backend(latency: Duration) -> (Arc<MemoryTransport>, Service) {
    init_tracing();
    let transport = Arc::new(MemoryTransport::new(CUSTOMER).with_latency(latency));
    let service = Service::new(transport.clone(), CUSTOMER);
    (transport, service)
}

pub fn config() -> ProviderConfig {
    ProviderConfig::new(CUSTOMER)
}

/// Create one policy set per type, returning their ids in the same order.
pub async fn seed_policy_sets(service: &Service, types: &[PolicyType]) -> Vec<String> {
    let mut ids = Vec::new();
    for &policy_type in types {
        let set = service
            .create(&PolicySet {
                name: format!("{policy_type} set"),
                enabled: true,
                policy_type: Some(policy_type),
                ..PolicySet::default()
            })
            .await
            .unwrap();
        ids.push(set.id);
    }
    ids
}

/// A rule with one OR condition holding the given operands.
pub fn rule(name: &str, policy_set_id: &str, operands: Vec<Operand>) -> PolicyRule {
    PolicyRule {
        name: name.into(),
        action: "ALLOW".into(),
        policy_set_id: policy_set_id.into(),
        conditions: vec![Condition {
            operator: "OR".into(),
            operands,
            ..Condition::default()
        }],
        ..PolicyRule::default()
    }
}

pub fn values_operand(object_type: &str, ids: &[&str]) -> Operand {
    Operand {
        object_type: object_type.into(),
        lhs: "id".into(),
        values: ids.iter().map(|id| id.to_string()).collect(),
        ..Operand::default()
    }
}
