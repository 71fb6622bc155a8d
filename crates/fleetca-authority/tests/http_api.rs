//! Integration tests for the HTTP surface
//!
//! Drives the axum router directly and asserts the status-code contract:
//! 201 on successful sign, 400 on parse/validate failures, 401 on
//! authorization failures, 403 on policy denials, 404 on empty trust
//! bundles, 500 on absent capabilities.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use fleetca_authority::{create_router, AppState, Authority};
use fleetca_authority::{SshTemplate, SshTemplates, TemplateKind};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{authority, public_key, user_token};

fn router_for(authority: Authority) -> axum::Router {
    create_router(Arc::new(AppState { authority }))
}

fn wire_key() -> String {
    STANDARD.encode(public_key().to_bytes().unwrap())
}

async fn post(router: axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(router: axum::Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_sign_returns_201_with_certificate() {
    let (status, body) = post(
        router_for(authority()),
        "/ssh/sign",
        json!({
            "publicKey": wire_key(),
            "ott": user_token("http-happy", &["alice"]),
            "certType": "user",
            "principals": ["alice"],
            "keyID": "alice@example",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["crt"].is_string(), "body: {body}");
    assert!(body.get("addUserCrt").is_none());
    assert!(body.get("identityCrt").is_none());
}

#[tokio::test]
async fn test_sign_with_empty_ott_is_400() {
    let (status, body) = post(
        router_for(authority()),
        "/ssh/sign",
        json!({
            "publicKey": wire_key(),
            "ott": "",
            "keyID": "alice@example",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("ott"));
}

#[tokio::test]
async fn test_sign_with_unknown_cert_type_is_400() {
    let (status, body) = post(
        router_for(authority()),
        "/ssh/sign",
        json!({
            "publicKey": wire_key(),
            "ott": user_token("http-badtype", &["alice"]),
            "certType": "server",
            "keyID": "alice@example",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("certType"));
}

#[tokio::test]
async fn test_sign_with_invalid_json_is_400() {
    let response = router_for(authority())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ssh/sign")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_replayed_token_is_401() {
    let router = router_for(authority());
    let token = user_token("http-replay", &["alice"]);
    let body = json!({
        "publicKey": wire_key(),
        "ott": token,
        "certType": "user",
        "principals": ["alice"],
        "keyID": "alice@example",
    });

    let (status, _) = post(router.clone(), "/ssh/sign", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, resp) = post(router, "/ssh/sign", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_principal_outside_policy_is_403() {
    let (status, body) = post(
        router_for(authority()),
        "/ssh/sign",
        json!({
            "publicKey": wire_key(),
            "ott": user_token("http-forbidden", &["alice"]),
            "certType": "user",
            "principals": ["root"],
            "keyID": "mallory@example",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_empty_roots_is_404() {
    let empty = Authority::builder()
        .with_provisioner(common::provisioner())
        .build()
        .unwrap();

    let (status, body) = get(router_for(empty), "/ssh/roots").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no keys found");
}

#[tokio::test]
async fn test_roots_lists_installed_ca_keys() {
    let (status, body) = get(router_for(authority()), "/ssh/roots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userKey"].as_array().unwrap().len(), 1);
    assert_eq!(body["hostKey"].as_array().unwrap().len(), 1);

    let (status, federation) = get(router_for(authority()), "/ssh/federation").await;
    assert_eq!(status, StatusCode::OK);
    assert!(federation["userKey"].is_array());
}

#[tokio::test]
async fn test_check_host_with_user_type_is_400() {
    let (status, _) = post(
        router_for(authority()),
        "/ssh/check-host",
        json!({"type": "user", "principal": "web01"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_host_without_callback_is_500() {
    let (status, body) = post(
        router_for(authority()),
        "/ssh/check-host",
        json!({"type": "host", "principal": "web01"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn test_hosts_without_callback_is_500() {
    let (status, body) = get(router_for(authority()), "/ssh/hosts").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn test_bastion_without_hostname_is_400() {
    let (status, _) = post(
        router_for(authority()),
        "/ssh/bastion",
        json!({"user": "alice"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_empty_type_defaults_to_user() {
    let (builder, _db) = common::builder();
    let with_templates = builder
        .with_ssh_templates(SshTemplates {
            user: vec![SshTemplate {
                name: "config".into(),
                kind: TemplateKind::File,
                path: "~/.ssh/config".into(),
                comment: "#".into(),
                content: "Host *.{{Domain}}\n".into(),
            }],
            host: Vec::new(),
        })
        .build()
        .unwrap();

    let (status, body) = post(
        router_for(with_templates),
        "/ssh/config",
        json!({"type": "", "data": {"Domain": "fleet.internal"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let outputs = body["userTemplates"].as_array().unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0]["content"], "Host *.fleet.internal\n");
    assert!(body.get("hostTemplates").is_none());
}

#[tokio::test]
async fn test_config_without_templates_is_500() {
    let (status, body) = post(
        router_for(authority()),
        "/ssh/config",
        json!({"type": "user", "data": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn test_renew_with_a_forged_certificate_is_400() {
    use ssh_encoding::Encode;

    let forged = common::forged_user_certificate("root");
    let mut wire = Vec::new();
    forged.encode(&mut wire).unwrap();

    let (status, body) = post(
        router_for(authority()),
        "/ssh/renew",
        json!({"crt": STANDARD.encode(wire)}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not trusted"));
}

#[tokio::test]
async fn test_renew_round_trip_over_the_wire() {
    let router = router_for(authority());

    let (status, signed) = post(
        router.clone(),
        "/ssh/sign",
        json!({
            "publicKey": wire_key(),
            "ott": user_token("http-renew", &["alice"]),
            "certType": "user",
            "principals": ["alice"],
            "keyID": "alice@example",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, renewed) = post(router, "/ssh/renew", json!({"crt": signed["crt"]})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(renewed["crt"].is_string());
}

struct PeerAwareHosts;

#[async_trait::async_trait]
impl fleetca_authority::HostEnumeration for PeerAwareHosts {
    async fn hosts(
        &self,
        peer_certificate: Option<&[u8]>,
    ) -> Result<Vec<fleetca_core::Host>, fleetca_authority::CaError> {
        // An authenticated caller sees the fleet; an anonymous one sees
        // nothing.
        match peer_certificate {
            Some(_) => Ok(vec![fleetca_core::Host::new("web01.fleet.internal")]),
            None => Ok(Vec::new()),
        }
    }
}

#[tokio::test]
async fn test_hosts_observes_the_peer_certificate() {
    let (builder, _db) = common::builder();
    let ca = builder
        .with_ssh_get_hosts_func(Arc::new(PeerAwareHosts))
        .build()
        .unwrap();
    let router = router_for(ca);

    let (status, body) = get(router.clone(), "/ssh/hosts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hosts"].as_array().unwrap().len(), 0);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/ssh/hosts")
                .extension(fleetca_authority::PeerCertificate(vec![0x30, 0x82]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["hosts"][0]["hostname"], "web01.fleet.internal");
}

#[tokio::test]
async fn test_health_and_ready() {
    let (status, body) = get(router_for(authority()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(router_for(authority()), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["user_ca_keys"], 1);
}
