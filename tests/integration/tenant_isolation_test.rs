use axum::http::{Method, StatusCode};
use fitdesk::auth::UserRole;
use tower::ServiceExt;

use crate::common::{ApiTestHelpers, DatabaseTestHelpers, TestDatabase};

#[tokio::test]
async fn test_staff_only_see_their_own_tenant() {
    let Some(db) = TestDatabase::connect().await else {
        println!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let app = db.app();

    let tenant_a = DatabaseTestHelpers::create_tenant(&db.pool).await;
    let tenant_b = DatabaseTestHelpers::create_tenant(&db.pool).await;
    let trainer_a = DatabaseTestHelpers::create_user(&db.pool, Some(tenant_a), UserRole::Trainer).await;
    let student_a = DatabaseTestHelpers::create_student(&db.pool, tenant_a, None).await;
    let student_b = DatabaseTestHelpers::create_student(&db.pool, tenant_b, None).await;

    let token = ApiTestHelpers::access_token(trainer_a, UserRole::Trainer, Some(tenant_a));

    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(Method::GET, "/api/students?limit=100", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = ApiTestHelpers::json_body(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert!(items.iter().any(|s| s["id"] == student_a.to_string()));
    assert!(items.iter().all(|s| s["tenant_id"] == tenant_a.to_string()));

    // Another tenant's record is indistinguishable from a missing one
    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(
            Method::GET,
            &format!("/api/students/{student_b}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(ApiTestHelpers::request(
            Method::DELETE,
            &format!("/api/students/{student_b}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_roles_are_enforced_per_area() {
    let Some(db) = TestDatabase::connect().await else {
        println!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let app = db.app();

    let tenant = DatabaseTestHelpers::create_tenant(&db.pool).await;
    let trainer = DatabaseTestHelpers::create_user(&db.pool, Some(tenant), UserRole::Trainer).await;
    let student_user = DatabaseTestHelpers::create_user(&db.pool, Some(tenant), UserRole::Student).await;
    let root = DatabaseTestHelpers::create_user(&db.pool, None, UserRole::SuperAdmin).await;

    let trainer_token = ApiTestHelpers::access_token(trainer, UserRole::Trainer, Some(tenant));
    let student_token = ApiTestHelpers::access_token(student_user, UserRole::Student, Some(tenant));
    let root_token = ApiTestHelpers::access_token(root, UserRole::SuperAdmin, None);

    let cases = [
        ("/api/admin/tenants", &trainer_token, StatusCode::FORBIDDEN),
        ("/api/admin/tenants", &student_token, StatusCode::FORBIDDEN),
        ("/api/students", &student_token, StatusCode::FORBIDDEN),
        ("/api/team", &trainer_token, StatusCode::FORBIDDEN),
        ("/api/me/workouts", &trainer_token, StatusCode::FORBIDDEN),
        ("/api/students", &root_token, StatusCode::FORBIDDEN),
        ("/api/admin/tenants", &root_token, StatusCode::OK),
        ("/api/students", &trainer_token, StatusCode::OK),
    ];

    for (uri, token, expected) in cases {
        let response = app
            .clone()
            .oneshot(ApiTestHelpers::request(Method::GET, uri, Some(token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "{uri}");
    }
}
