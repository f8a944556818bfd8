mod common;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{build_context, read_json};
use gateway::app::build_router;
use gateway::auth::provider::{Provider, ProviderError, UserInfo};
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

struct TestProvider;

#[async_trait]
impl Provider for TestProvider {
    fn name(&self) -> &str {
        "test"
    }

    fn issuer(&self) -> &str {
        "https://idp.test"
    }

    fn auth_url(&self, state: &str, nonce: &str) -> String {
        format!("https://idp.test/authorize?state={state}&nonce={nonce}")
    }

    async fn exchange_code(&self, code: &str, _nonce: &str) -> Result<UserInfo, ProviderError> {
        if code != "good-code" {
            return Err(ProviderError::Exchange("invalid code".to_string()));
        }
        Ok(UserInfo {
            issuer: "https://idp.test".to_string(),
            subject: "user-1".to_string(),
            email: Some("user-1@example.com".to_string()),
            display_name: Some("User One".to_string()),
        })
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn location_param(response: &axum::response::Response, param: &str) -> String {
    let location = response
        .headers()
        .get(header::LOCATION)
        .expect("location")
        .to_str()
        .expect("utf8");
    let url = Url::parse(location).expect("location url");
    url.query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| value.to_string())
        .expect("param")
}

#[tokio::test]
async fn login_redirects_to_provider_with_state() {
    let ctx = build_context(Some(Arc::new(TestProvider)));
    let router = build_router(ctx.state.clone());

    let response = router
        .oneshot(get("/auth/login?provider=test&redirect_uri=/machines"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FOUND);
    let state = location_param(&response, "state");
    let nonce = location_param(&response, "nonce");
    assert!(!state.is_empty());
    assert!(!nonce.is_empty());
    assert_ne!(state, nonce);
}

#[tokio::test]
async fn login_rejects_unknown_provider_and_foreign_redirect() {
    let ctx = build_context(Some(Arc::new(TestProvider)));
    let router = build_router(ctx.state.clone());

    let response = router
        .clone()
        .oneshot(get("/auth/login?provider=nope"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(get(
            "/auth/login?provider=test&redirect_uri=https://evil.example.com/",
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn callback_issues_session_and_consumes_state() {
    let ctx = build_context(Some(Arc::new(TestProvider)));
    let router = build_router(ctx.state.clone());

    let response = router
        .clone()
        .oneshot(get("/auth/login?provider=test&redirect_uri=/machines"))
        .await
        .expect("response");
    let state = location_param(&response, "state");

    let callback_uri = format!("/auth/callback?code=good-code&state={state}");
    let response = router
        .clone()
        .oneshot(get(&callback_uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .expect("location")
            .to_str()
            .expect("utf8"),
        "/machines"
    );
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("cookie")
        .to_str()
        .expect("utf8");
    assert!(cookie.starts_with("meshgate_session="));
    assert!(cookie.contains("HttpOnly"));
    let session_header = response
        .headers()
        .get("x-meshgate-session")
        .expect("session header")
        .to_str()
        .expect("utf8");
    assert!(!session_header.is_empty());

    // The realm exists in the fake mesh with its isolation rule.
    let namespaces = ctx.mesh.namespaces.lock().expect("lock").clone();
    assert_eq!(namespaces.len(), 1);
    assert!(namespaces[0].starts_with("r-"));
    let policy = ctx.mesh.policy.lock().expect("lock").clone();
    assert!(policy.has_rule_for(&namespaces[0]));

    // Replaying the same code/state fails: the state was consumed.
    let response = router
        .oneshot(get(&callback_uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_maps_exchange_failure_to_upstream_error() {
    let ctx = build_context(Some(Arc::new(TestProvider)));
    let router = build_router(ctx.state.clone());

    let response = router
        .clone()
        .oneshot(get("/auth/login?provider=test"))
        .await
        .expect("response");
    let state = location_param(&response, "state");

    let response = router
        .oneshot(get(&format!("/auth/callback?code=bad-code&state={state}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json(response).await;
    assert_eq!(body["code"], "upstream_error");
}

#[tokio::test]
async fn repeated_logins_reuse_the_same_realm() {
    let ctx = build_context(Some(Arc::new(TestProvider)));
    let router = build_router(ctx.state.clone());

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(get("/auth/login?provider=test"))
            .await
            .expect("response");
        let state = location_param(&response, "state");
        let response = router
            .clone()
            .oneshot(get(&format!("/auth/callback?code=good-code&state={state}")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    assert_eq!(ctx.mesh.namespaces.lock().expect("lock").len(), 1);
    assert_eq!(ctx.mesh.policy.lock().expect("lock").acls.len(), 1);
}
