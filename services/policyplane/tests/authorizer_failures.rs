mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{read_json, test_stores};
use http_helpers::json_request;
use policyplane::app::{AppState, build_router};
use policyplane::auth::authorizer::{Authorizer, AuthorizerError, Decision};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;
use warden_rbac::RequestAttributes;

struct Unreachable;

#[async_trait]
impl Authorizer for Unreachable {
    async fn authorize(&self, _: &RequestAttributes) -> Result<Decision, AuthorizerError> {
        Err(AuthorizerError::Unavailable("connection refused".to_string()))
    }
}

struct Stalled;

#[async_trait]
impl Authorizer for Stalled {
    async fn authorize(&self, _: &RequestAttributes) -> Result<Decision, AuthorizerError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Decision::Allow)
    }
}

fn empty_role() -> serde_json::Value {
    json!({ "metadata": { "name": "empty" }, "rules": [] })
}

#[tokio::test]
async fn authorizer_error_is_service_unavailable() {
    let state = AppState::new(
        test_stores(),
        std::sync::Arc::new(Unreachable),
        Duration::from_secs(1),
        "system:masters",
    );
    let app = build_router(state).into_service();
    let response = app
        .oneshot(json_request(
            "POST",
            "/apis/rbac/v1/namespaces/ns1/roles",
            "alice",
            &[],
            empty_role(),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(response).await;
    assert_eq!(body["code"], "unavailable");
    assert!(
        body["message"]
            .as_str()
            .expect("message")
            .contains("connection refused")
    );
}

#[tokio::test]
async fn authorizer_timeout_is_service_unavailable() {
    let state = AppState::new(
        test_stores(),
        std::sync::Arc::new(Stalled),
        Duration::from_millis(50),
        "system:masters",
    );
    let app = build_router(state).into_service();
    let response = app
        .oneshot(json_request(
            "POST",
            "/apis/rbac/v1/namespaces/ns1/rolebindings",
            "alice",
            &[],
            json!({
                "metadata": { "name": "b" },
                "subjects": [{ "kind": "User", "name": "carol" }],
                "roleRef": { "kind": "Role", "name": "anything" }
            }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(response).await;
    assert!(body["message"].as_str().expect("message").contains("timed out"));
}

#[tokio::test]
async fn bypass_does_not_consult_the_authorizer() {
    let state = AppState::new(
        test_stores(),
        std::sync::Arc::new(Unreachable),
        Duration::from_secs(1),
        "system:masters",
    );
    let app = build_router(state).into_service();
    let response = app
        .oneshot(json_request(
            "POST",
            "/apis/rbac/v1/namespaces/ns1/roles",
            "root",
            &["system:masters"],
            empty_role(),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);
}
