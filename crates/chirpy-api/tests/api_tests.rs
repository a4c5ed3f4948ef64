//! API Integration Tests
//!
//! Every test drives the full router over in-memory storage.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chirpy_api::auth::jwt::{decode_claims_at, validate_access_token, JwtConfig};
use chirpy_api::create_router_for_testing;
use chirpy_api::test_utils::{
    create_router_with_config, create_test_state, test_config, TEST_JWT_SECRET, TEST_POLKA_KEY,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::time::Duration as StdDuration;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper to create a test request
fn create_json_request(
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn jwt_config() -> JwtConfig {
    JwtConfig::new(TEST_JWT_SECRET, StdDuration::from_secs(3600))
}

async fn create_user(app: &Router, email: &str, password: &str) -> Value {
    let response = send(
        app,
        create_json_request(
            "POST",
            "/api/users",
            None,
            Some(json!({"email": email, "password": password})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn login(app: &Router, email: &str, password: &str) -> Value {
    let response = send(
        app,
        create_json_request(
            "POST",
            "/api/login",
            None,
            Some(json!({"email": email, "password": password})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn post_chirp(app: &Router, token: &str, body: &str) -> Response {
    send(
        app,
        create_json_request(
            "POST",
            "/api/chirps",
            Some(&bearer(token)),
            Some(json!({ "body": body })),
        ),
    )
    .await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_healthz() {
    let app = create_router_for_testing();

    let response = send(
        &app,
        Request::builder()
            .uri("/api/healthz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_text(response).await, "OK");
}

// =============================================================================
// User Tests
// =============================================================================

#[tokio::test]
async fn test_create_user_hides_password_hash() {
    let app = create_router_for_testing();

    let user = create_user(&app, "lane@example.com", "04234").await;

    assert_eq!(user["email"], "lane@example.com");
    assert_eq!(user["is_chirpy_red"], false);
    assert!(user["id"].is_string());
    assert!(user.get("hashed_password").is_none());
    assert!(user.get("password").is_none());
    assert!(user.get("token").is_none());
}

#[tokio::test]
async fn test_create_user_invalid_input() {
    let app = create_router_for_testing();

    for payload in [
        json!({"email": "not-an-email", "password": "pw"}),
        json!({"email": "a@b.c", "password": ""}),
    ] {
        let response = send(
            &app,
            create_json_request("POST", "/api/users", None, Some(payload)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error = body_json(response).await;
        assert_eq!(error["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_create_user_duplicate_email() {
    let app = create_router_for_testing();
    create_user(&app, "dup@example.com", "pw").await;

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/users",
            None,
            Some(json!({"email": "dup@example.com", "password": "other"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_user_requires_access_token() {
    let app = create_router_for_testing();
    create_user(&app, "walt@example.com", "old").await;
    let session = login(&app, "walt@example.com", "old").await;

    let payload = json!({"email": "heisenberg@example.com", "password": "new"});

    let response = send(
        &app,
        create_json_request("PUT", "/api/users", None, Some(payload.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token
    let refresh = session["refresh_token"].as_str().unwrap();
    let response = send(
        &app,
        create_json_request("PUT", "/api/users", Some(&bearer(refresh)), Some(payload.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = session["token"].as_str().unwrap();
    let response = send(
        &app,
        create_json_request("PUT", "/api/users", Some(&bearer(token)), Some(payload)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["email"], "heisenberg@example.com");
    assert_eq!(updated["id"], session["id"]);

    login(&app, "heisenberg@example.com", "new").await;
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_issues_access_and_refresh_tokens() {
    let state = create_test_state(test_config());
    let app = chirpy_api::create_router(state.clone());
    let user = create_user(&app, "saul@example.com", "123456").await;

    let before = Utc::now();
    let session = login(&app, "saul@example.com", "123456").await;

    assert_eq!(session["id"], user["id"]);
    assert_eq!(session["email"], "saul@example.com");

    // Access token lives for the configured TTL
    let token = session["token"].as_str().unwrap();
    let claims = decode_claims_at(&jwt_config(), token, Utc::now()).unwrap();
    assert_eq!(claims.iss, "chirpy");
    assert_eq!(claims.sub, user["id"].as_str().unwrap());
    assert_eq!(claims.exp - claims.iat, 3600);

    // Refresh token is stored with a 60 day lifetime
    let refresh = session["refresh_token"].as_str().unwrap();
    assert_eq!(refresh.len(), 43);
    let record = state.auth.refresh_tokens().lookup(refresh).await.unwrap();
    assert_eq!(record.expires_at - record.created_at, Duration::days(60));
    assert!(record.created_at >= before - Duration::seconds(1));
    assert!(record.revoked_at.is_none());
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let app = create_router_for_testing();
    create_user(&app, "kim@example.com", "right").await;

    let mut messages = Vec::new();
    for (email, password) in [("kim@example.com", "wrong"), ("nobody@example.com", "right")] {
        let response = send(
            &app,
            create_json_request(
                "POST",
                "/api/login",
                None,
                Some(json!({"email": email, "password": password})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        messages.push(body_json(response).await["message"].clone());
    }

    assert_eq!(messages[0], messages[1]);
}

// =============================================================================
// Refresh / Revoke Tests
// =============================================================================

#[tokio::test]
async fn test_refresh_is_repeatable() {
    let app = create_router_for_testing();
    let user = create_user(&app, "mike@example.com", "pw").await;
    let session = login(&app, "mike@example.com", "pw").await;
    let refresh = session["refresh_token"].as_str().unwrap();

    for _ in 0..2 {
        let response = send(
            &app,
            create_json_request("POST", "/api/refresh", Some(&bearer(refresh)), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap();
        let user_id = validate_access_token(&jwt_config(), token).unwrap();
        assert_eq!(user_id.to_string(), user["id"].as_str().unwrap());
    }
}

#[tokio::test]
async fn test_revoke_then_refresh_is_unauthorized() {
    let app = create_router_for_testing();
    create_user(&app, "gus@example.com", "pw").await;
    let session = login(&app, "gus@example.com", "pw").await;
    let refresh = session["refresh_token"].as_str().unwrap();

    let response = send(
        &app,
        create_json_request("POST", "/api/revoke", Some(&bearer(refresh)), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Revoking again is not an error
    let response = send(
        &app,
        create_json_request("POST", "/api/revoke", Some(&bearer(refresh)), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        create_json_request("POST", "/api/refresh", Some(&bearer(refresh)), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_unknown_token() {
    let app = create_router_for_testing();

    for uri in ["/api/refresh", "/api/revoke"] {
        let response = send(
            &app,
            create_json_request("POST", uri, Some("Bearer never-issued"), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_refresh_header_problems_are_bad_requests() {
    let app = create_router_for_testing();

    for authorization in [None, Some("Basic xyz"), Some("Bearer a b")] {
        let response = send(
            &app,
            create_json_request("POST", "/api/refresh", authorization, None),
        )
        .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "{authorization:?}"
        );
    }
}

// =============================================================================
// Chirp Tests
// =============================================================================

#[tokio::test]
async fn test_validate_chirp() {
    let app = create_router_for_testing();

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/validate_chirp",
            None,
            Some(json!({"body": "I hear Mastodon is better than Chirpy. sharbert I need to migrate"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["cleaned_body"],
        "I hear Mastodon is better than Chirpy. **** I need to migrate"
    );

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/validate_chirp",
            None,
            Some(json!({"body": "x".repeat(141)})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_chirp_requires_valid_token() {
    let app = create_router_for_testing();

    let response = post_chirp(&app, "not.a.jwt", "hello").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        create_json_request("POST", "/api/chirps", None, Some(json!({"body": "hello"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Signed with a different secret
    let forged = chirpy_api::auth::generate_access_token(
        &JwtConfig::new("someone-elses-secret", StdDuration::from_secs(3600)),
        Uuid::new_v4(),
        StdDuration::from_secs(3600),
    )
    .unwrap();
    let response = post_chirp(&app, &forged, "hello").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_fetch_chirp() {
    let app = create_router_for_testing();
    let user = create_user(&app, "jesse@example.com", "pw").await;
    let session = login(&app, "jesse@example.com", "pw").await;
    let token = session["token"].as_str().unwrap();

    let response = post_chirp(&app, token, "This is a kerfuffle opinion").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let chirp = body_json(response).await;
    assert_eq!(chirp["body"], "This is a **** opinion");
    assert_eq!(chirp["user_id"], user["id"]);

    let uri = format!("/api/chirps/{}", chirp["id"].as_str().unwrap());
    let response = send(&app, create_json_request("GET", &uri, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], chirp["id"]);

    let response = send(
        &app,
        create_json_request("GET", &format!("/api/chirps/{}", Uuid::new_v4()), None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        create_json_request("GET", "/api/chirps/not-a-uuid", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_chirps_filter_and_sort() {
    let app = create_router_for_testing();
    let alice = create_user(&app, "alice@example.com", "pw").await;
    create_user(&app, "bob@example.com", "pw").await;
    let alice_token = login(&app, "alice@example.com", "pw").await["token"].clone();
    let bob_token = login(&app, "bob@example.com", "pw").await["token"].clone();

    for body in ["first", "second"] {
        let response = post_chirp(&app, alice_token.as_str().unwrap(), body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = post_chirp(&app, bob_token.as_str().unwrap(), "bob's").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, create_json_request("GET", "/api/chirps", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);

    let uri = format!(
        "/api/chirps?author_id={}&sort=desc",
        alice["id"].as_str().unwrap()
    );
    let response = send(&app, create_json_request("GET", &uri, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let chirps = body_json(response).await;
    let bodies: Vec<&str> = chirps
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["second", "first"]);

    let response = send(
        &app,
        create_json_request("GET", "/api/chirps?sort=sideways", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_chirp_ownership() {
    let app = create_router_for_testing();
    create_user(&app, "owner@example.com", "pw").await;
    create_user(&app, "other@example.com", "pw").await;
    let owner_token = login(&app, "owner@example.com", "pw").await["token"].clone();
    let other_token = login(&app, "other@example.com", "pw").await["token"].clone();
    let owner_token = owner_token.as_str().unwrap();
    let other_token = other_token.as_str().unwrap();

    let chirp = body_json(post_chirp(&app, owner_token, "mine").await).await;
    let uri = format!("/api/chirps/{}", chirp["id"].as_str().unwrap());

    let response = send(
        &app,
        create_json_request("DELETE", &uri, Some(&bearer(other_token)), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        create_json_request("DELETE", &uri, Some(&bearer(owner_token)), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        create_json_request("DELETE", &uri, Some(&bearer(owner_token)), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Webhook Tests
// =============================================================================

#[tokio::test]
async fn test_polka_webhook_upgrades_user() {
    let app = create_router_for_testing();
    let user = create_user(&app, "red@example.com", "pw").await;
    let api_key = format!("ApiKey {TEST_POLKA_KEY}");

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/polka/webhooks",
            Some(&api_key),
            Some(json!({"event": "user.upgraded", "data": {"user_id": user["id"]}})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let session = login(&app, "red@example.com", "pw").await;
    assert_eq!(session["is_chirpy_red"], true);
}

#[tokio::test]
async fn test_polka_webhook_other_events_and_unknown_user() {
    let app = create_router_for_testing();
    let api_key = format!("ApiKey {TEST_POLKA_KEY}");

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/polka/webhooks",
            Some(&api_key),
            Some(json!({"event": "user.payment_failed", "data": {"user_id": Uuid::new_v4()}})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/polka/webhooks",
            Some(&api_key),
            Some(json!({"event": "user.upgraded", "data": {"user_id": Uuid::new_v4()}})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_polka_webhook_rejects_bad_key() {
    let app = create_router_for_testing();
    let payload = json!({"event": "user.upgraded", "data": {"user_id": Uuid::new_v4()}});

    for authorization in [None, Some("ApiKey wrong-key")] {
        let response = send(
            &app,
            create_json_request(
                "POST",
                "/api/polka/webhooks",
                authorization,
                Some(payload.clone()),
            ),
        )
        .await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{authorization:?}"
        );
    }
}

// =============================================================================
// Admin Tests
// =============================================================================

#[tokio::test]
async fn test_file_server_hits_are_counted() {
    let app = create_router_for_testing();

    for _ in 0..3 {
        send(
            &app,
            Request::builder().uri("/app/").body(Body::empty()).unwrap(),
        )
        .await;
    }

    let response = send(&app, create_json_request("GET", "/admin/metrics", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Chirpy has been visited 3 times!"));
}

#[tokio::test]
async fn test_reset_in_dev_deletes_users() {
    let app = create_router_for_testing();
    create_user(&app, "gone@example.com", "pw").await;
    send(
        &app,
        Request::builder().uri("/app/").body(Body::empty()).unwrap(),
    )
    .await;

    let response = send(&app, create_json_request("POST", "/admin/reset", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, create_json_request("GET", "/admin/metrics", None, None)).await;
    assert!(body_text(response)
        .await
        .contains("Chirpy has been visited 0 times!"));

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/login",
            None,
            Some(json!({"email": "gone@example.com", "password": "pw"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_outside_dev_is_forbidden() {
    let mut config = test_config();
    config.server.platform = "production".to_string();
    let app = create_router_with_config(config);

    let response = send(&app, create_json_request("POST", "/admin/reset", None, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// OpenAPI Tests
// =============================================================================

#[tokio::test]
async fn test_openapi_spec_available() {
    let app = create_router_for_testing();

    let response = send(
        &app,
        Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["openapi"].is_string());
    assert!(json["paths"]["/api/login"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
}
