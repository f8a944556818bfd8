mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{build_context, login_session, read_json};
use gateway::app::build_router;
use gateway::auth::session::SESSION_HEADER;
use tower::ServiceExt;

fn request(
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    session: Option<&str>,
    bearer: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    if let Some(token) = session {
        builder = builder.header(SESSION_HEADER, token);
    }
    if let Some(key) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    builder
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .expect("request")
}

async fn create_key(
    router: &axum::Router,
    session: &str,
    scopes: serde_json::Value,
) -> (String, String) {
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/api-keys",
            Some(serde_json::json!({"name": "ci", "scopes": scopes, "expires_at": null})),
            Some(session),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    (
        body["id"].as_str().expect("id").to_string(),
        body["key"].as_str().expect("key").to_string(),
    )
}

#[tokio::test]
async fn created_key_is_shown_once_and_lists_as_metadata() {
    let ctx = build_context(None);
    let router = build_router(ctx.state.clone());
    let (_identity, session) = login_session(&ctx, "owner").await;

    let (id, plaintext) = create_key(&router, &session, serde_json::json!(["nodes:read"])).await;
    assert!(plaintext.starts_with("mgk_"));

    let response = router
        .oneshot(request("GET", "/api/v1/api-keys", None, Some(&session), None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let items = body["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], serde_json::json!(id));
    assert_eq!(items[0]["scopes"], serde_json::json!(["nodes:read"]));
    // The plaintext never appears after creation.
    assert!(items[0].get("key").is_none());
    assert!(!body.to_string().contains(&plaintext));
}

#[tokio::test]
async fn api_key_authenticates_nodes_listing_with_exact_scope() {
    let ctx = build_context(None);
    let router = build_router(ctx.state.clone());
    let (_identity, session) = login_session(&ctx, "owner").await;

    let (_id, read_key) = create_key(&router, &session, serde_json::json!(["nodes:read"])).await;
    let response = router
        .clone()
        .oneshot(request("GET", "/api/v1/nodes", None, None, Some(&read_key)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["items"][0]["name"], "worker-a");

    // "nodes:readwrite" must not satisfy a "nodes:read" requirement.
    let (_id, rw_key) =
        create_key(&router, &session, serde_json::json!(["nodes:readwrite"])).await;
    let response = router
        .clone()
        .oneshot(request("GET", "/api/v1/nodes", None, None, Some(&rw_key)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request("GET", "/api/v1/nodes", None, None, Some("mgk_bogus_key")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoked_key_stops_authenticating() {
    let ctx = build_context(None);
    let router = build_router(ctx.state.clone());
    let (_identity, session) = login_session(&ctx, "owner").await;
    let (id, key) = create_key(&router, &session, serde_json::json!(["nodes:read"])).await;

    let response = router
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/api-keys/{id}"),
            None,
            Some(&session),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .clone()
        .oneshot(request("GET", "/api/v1/nodes", None, None, Some(&key)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Deleting again reports not found.
    let response = router
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/api-keys/{id}"),
            None,
            Some(&session),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_identities_cannot_delete_foreign_keys() {
    let ctx = build_context(None);
    let router = build_router(ctx.state.clone());
    let (_owner, owner_session) = login_session(&ctx, "owner").await;
    let (_other, other_session) = login_session(&ctx, "other").await;
    let (id, _key) =
        create_key(&router, &owner_session, serde_json::json!(["nodes:read"])).await;

    let response = router
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/api-keys/{id}"),
            None,
            Some(&other_session),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creation_validates_name_and_scopes() {
    let ctx = build_context(None);
    let router = build_router(ctx.state.clone());
    let (_identity, session) = login_session(&ctx, "owner").await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/api-keys",
            Some(serde_json::json!({"name": "", "scopes": ["nodes:read"]})),
            Some(&session),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(request(
            "POST",
            "/api/v1/api-keys",
            Some(serde_json::json!({"name": "ci", "scopes": []})),
            Some(&session),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
