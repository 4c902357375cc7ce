use zpa_client::ClientError;
use zpa_provisioner::error::format_err_chain;
use zpa_provisioner::{Attr, Diagnostics, ProvisionerError};

#[test]
fn resource_context_is_added_once() {
    let err = ProvisionerError::NotFound {
        kind: "server group".into(),
        id: "7".into(),
    }
    .with_resource("server group", "7")
    .with_resource("outer", "8");

    assert_eq!(err.to_string(), "server group (7): server group not found: 7");
    assert!(err.is_not_found());
    assert_eq!(err.summary(), "Resource not found");
}

#[test]
fn client_errors_keep_their_classification() {
    let err = ProvisionerError::from(ClientError::not_found("/segmentGroup/1", "gone"))
        .with_resource("segment group", "");
    assert!(err.is_not_found());
    assert!(err.to_string().starts_with("segment group: "));

    let err = ProvisionerError::from(ClientError::Cancelled);
    assert!(err.is_cancelled());
    assert_eq!(err.summary(), "Operation cancelled");
}

#[test]
fn error_chain_includes_causes() {
    let body = br#"{"id":"internal.error","reason":"boom"}"#;
    let err = ProvisionerError::from(ClientError::from_response(500, "/x", body));
    let chain = format_err_chain(&err);
    assert!(chain.starts_with("API error: "));
    assert!(chain.contains("boom"));
}

#[test]
fn diagnostics_fail_only_on_errors() {
    let mut diags = Diagnostics::new();
    diags.warning("Deprecated", "use pra_portal_ids");
    assert_eq!(diags.clone().into_result(5).unwrap(), 5);

    diags.error("Invalid configuration", "name must be provided");
    diags.error("Invalid configuration", "segment_group_id must be provided");
    let err = diags.into_result(()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid configuration: Invalid configuration: name must be provided; \
         Invalid configuration: segment_group_id must be provided"
    );
}

#[test]
fn only_known_values_are_persisted() {
    let values = vec![Attr::Known("a".to_string()), Attr::Unknown, Attr::Null];
    assert_eq!(serde_json::to_string(&values).unwrap(), r#"["a",null,null]"#);

    let parsed: Vec<Attr<String>> = serde_json::from_str(r#"["b",null]"#).unwrap();
    assert_eq!(parsed, [Attr::Known("b".to_string()), Attr::Null]);
    assert_eq!(Attr::Known("  ".to_string()).trimmed(), None);
    assert_eq!(Attr::<String>::Unknown.or_known(Some("x".into())), Attr::Known("x".into()));
}
