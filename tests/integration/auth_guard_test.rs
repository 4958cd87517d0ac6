use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use fitdesk::auth::{JwtService, TokenSubject, UserRole};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::{offline_app, test_config, ApiTestHelpers, TEST_JWT_SECRET};

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = offline_app(&test_config());

    for uri in ["/api/students", "/api/admin/tenants", "/api/me", "/api/dashboard", "/api/notifications"] {
        let response = app
            .clone()
            .oneshot(ApiTestHelpers::request(Method::GET, uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let body = ApiTestHelpers::json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "missing_auth_header");
    }
}

#[tokio::test]
async fn test_non_bearer_header_rejected() {
    let request = Request::builder()
        .uri("/api/students")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = offline_app(&test_config()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_cannot_call_the_api() {
    let refresh = JwtService::new(TEST_JWT_SECRET)
        .create_refresh_token(TokenSubject {
            user_id: Uuid::new_v4(),
            email: "coach@irongym.dev",
            role: UserRole::Trainer,
            tenant_id: Some(Uuid::new_v4()),
        })
        .unwrap();

    let response = offline_app(&test_config())
        .oneshot(ApiTestHelpers::request(Method::GET, "/api/students", Some(&refresh), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiTestHelpers::json_body(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_signed_with_another_secret_rejected() {
    let token = JwtService::new("some-other-deployment-secret")
        .create_access_token(TokenSubject {
            user_id: Uuid::new_v4(),
            email: "root@fitdesk.dev",
            role: UserRole::SuperAdmin,
            tenant_id: None,
        })
        .unwrap();

    let response = offline_app(&test_config())
        .oneshot(ApiTestHelpers::request(Method::GET, "/api/admin/overview", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_body_is_validated_before_lookup() {
    let response = offline_app(&test_config())
        .oneshot(ApiTestHelpers::request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "not-an-email", "password": "" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = ApiTestHelpers::json_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["password"].is_array());
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();

    let response = offline_app(&test_config()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiTestHelpers::json_body(response).await["error"], "bad_request");
}

fn login_attempt(peer: Option<&str>, forwarded_for: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(json!({ "email": "bad", "password": "x" }).to_string()))
        .unwrap();
    if let Some(peer) = peer {
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    }
    request
}

#[tokio::test]
async fn test_login_attempts_are_rate_limited_per_peer() {
    let mut config = test_config();
    config.login_rate_limit_per_minute = 2;
    let app = offline_app(&config);

    // A fresh forwarded address on every attempt does not reset the budget
    for spoofed in ["198.51.100.1", "198.51.100.2"] {
        let response = app.clone().oneshot(login_attempt(Some("10.0.0.1:40000"), spoofed)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let limited = app
        .clone()
        .oneshot(login_attempt(Some("10.0.0.1:40001"), "198.51.100.3"))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_peer = app.oneshot(login_attempt(Some("10.0.0.2:40000"), "198.51.100.1")).await.unwrap();
    assert_eq!(other_peer.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rate_limit_follows_forwarded_header_behind_proxy() {
    let mut config = test_config();
    config.login_rate_limit_per_minute = 1;
    config.trust_proxy_headers = true;
    let app = offline_app(&config);

    let proxy = Some("10.0.0.254:443");
    let first = app.clone().oneshot(login_attempt(proxy, "198.51.100.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let repeated = app.clone().oneshot(login_attempt(proxy, "198.51.100.1")).await.unwrap();
    assert_eq!(repeated.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_client = app.oneshot(login_attempt(proxy, "198.51.100.2")).await.unwrap();
    assert_eq!(other_client.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unidentified_login_callers_do_not_share_a_bucket() {
    let mut config = test_config();
    config.login_rate_limit_per_minute = 1;
    let app = offline_app(&config);

    for _ in 0..3 {
        let response = app.clone().oneshot(login_attempt(None, "198.51.100.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_every_response_carries_nosniff() {
    let app = offline_app(&test_config());

    for (method, uri) in [(Method::GET, "/api/students"), (Method::GET, "/no-such-route")] {
        let response = app.clone().oneshot(ApiTestHelpers::request(method, uri, None, None)).await.unwrap();
        assert_eq!(
            response.headers().get("x-content-type-options").map(|v| v.as_bytes()),
            Some(&b"nosniff"[..]),
            "{uri}"
        );
    }
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let response = offline_app(&test_config())
        .oneshot(ApiTestHelpers::request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.headers().get("x-content-type-options").map(|v| v.as_bytes()),
        Some(&b"nosniff"[..])
    );

    let body = ApiTestHelpers::json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "down");
    assert_eq!(body["service"], "fitdesk");
}
