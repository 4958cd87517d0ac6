use axum::http::{Method, StatusCode};
use fitdesk::auth::UserRole;
use pretty_assertions::assert_ne;
use serde_json::json;
use tower::ServiceExt;

use crate::common::{ApiTestHelpers, DatabaseTestHelpers, TestDatabase};

const PASSWORD: &str = "Sessions#2024";

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replayed_token() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };
    let app = db.app();
    let tenant_id = DatabaseTestHelpers::create_tenant(&db.pool).await;
    let (_, email) =
        DatabaseTestHelpers::create_user_with_password(&db.pool, Some(tenant_id), UserRole::Trainer, PASSWORD).await;

    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login = ApiTestHelpers::json_body(response).await;
    let first_refresh = login["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": first_refresh })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = ApiTestHelpers::json_body(response).await;
    let second_refresh = refreshed["data"]["refresh_token"].as_str().unwrap().to_string();
    assert!(refreshed["data"]["access_token"].is_string());
    assert_ne!(first_refresh, second_refresh);

    // The consumed token is dead
    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": first_refresh })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The rotated one still works
    let response = app
        .oneshot(ApiTestHelpers::request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": second_refresh })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
