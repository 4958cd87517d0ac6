use axum::http::{Method, StatusCode};
use chrono::{Duration, NaiveTime, Utc};
use fitdesk::auth::UserRole;
use fitdesk::models::CreateSlotRequest;
use fitdesk::services::ScheduleService;
use serde_json::json;
use tower::ServiceExt;

use crate::common::{ApiTestHelpers, DatabaseTestHelpers, TestDatabase};

#[tokio::test]
async fn test_a_slot_can_only_be_booked_once() {
    let Some(db) = TestDatabase::connect().await else {
        println!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let app = db.app();

    let tenant = DatabaseTestHelpers::create_tenant(&db.pool).await;
    let trainer = DatabaseTestHelpers::create_user(&db.pool, Some(tenant), UserRole::Trainer).await;
    let ana_user = DatabaseTestHelpers::create_user(&db.pool, Some(tenant), UserRole::Student).await;
    let bruno_user = DatabaseTestHelpers::create_user(&db.pool, Some(tenant), UserRole::Student).await;
    DatabaseTestHelpers::create_student(&db.pool, tenant, Some(ana_user)).await;
    DatabaseTestHelpers::create_student(&db.pool, tenant, Some(bruno_user)).await;

    let slot = ScheduleService::new(db.pool.clone())
        .create_slot(
            tenant,
            trainer,
            &CreateSlotRequest {
                trainer_id: None,
                student_id: None,
                slot_date: Utc::now().date_naive() + Duration::days(2),
                start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                duration_minutes: 60,
                notes: None,
            },
        )
        .await
        .unwrap();

    let ana = ApiTestHelpers::access_token(ana_user, UserRole::Student, Some(tenant));
    let bruno = ApiTestHelpers::access_token(bruno_user, UserRole::Student, Some(tenant));
    let book_uri = format!("/api/schedule/slots/{}/book", slot.id);
    let cancel_uri = format!("/api/schedule/slots/{}/cancel", slot.id);

    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(Method::POST, &book_uri, Some(&ana), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ApiTestHelpers::json_body(response).await["data"]["status"], "booked");

    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(Method::POST, &book_uri, Some(&bruno), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Only the student holding the booking may release it
    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(Method::POST, &cancel_uri, Some(&bruno), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(ApiTestHelpers::request(Method::POST, &cancel_uri, Some(&ana), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = ApiTestHelpers::json_body(response).await;
    assert_eq!(body["data"]["status"], "available");
    assert!(body["data"]["student_id"].is_null());

    let notifications: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
        .bind(trainer)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(notifications, 2);
}

#[tokio::test]
async fn test_recurring_schedule_limits() {
    let Some(db) = TestDatabase::connect().await else {
        println!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let app = db.app();

    let tenant = DatabaseTestHelpers::create_tenant(&db.pool).await;
    let trainer = DatabaseTestHelpers::create_user(&db.pool, Some(tenant), UserRole::Trainer).await;
    let token = ApiTestHelpers::access_token(trainer, UserRole::Trainer, Some(tenant));

    let too_long = json!({
        "start_date": "2025-01-01",
        "end_date": "2026-06-30",
        "weekdays": [1, 3],
        "times": ["07:00:00"],
        "duration_minutes": 60
    });
    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(Method::POST, "/api/schedule/recurring/preview", Some(&token), Some(too_long)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let times: Vec<String> = (0..60).map(|minute| format!("06:{minute:02}:00")).collect();
    let too_many_times = json!({
        "start_date": "2025-01-01",
        "end_date": "2025-12-31",
        "weekdays": [0, 1, 2, 3, 4, 5, 6],
        "times": times,
        "duration_minutes": 5
    });
    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(Method::POST, "/api/schedule/recurring/preview", Some(&token), Some(too_many_times)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = ApiTestHelpers::json_body(response).await;
    assert!(body["fields"]["times"].is_array());

    let nothing_matches = json!({
        "start_date": "2025-01-06",
        "end_date": "2025-01-07",
        "weekdays": [5],
        "times": ["07:00:00"],
        "duration_minutes": 60
    });
    let response = app
        .clone()
        .oneshot(ApiTestHelpers::request(Method::POST, "/api/schedule/recurring", Some(&token), Some(nothing_matches)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // 2025-01-06 is a Monday: two Mondays and two Wednesdays, two times each
    let two_weeks = json!({
        "start_date": "2025-01-06",
        "end_date": "2025-01-19",
        "weekdays": [1, 3],
        "times": ["07:00:00", "18:30:00"],
        "duration_minutes": 50
    });
    let response = app
        .oneshot(ApiTestHelpers::request(Method::POST, "/api/schedule/recurring", Some(&token), Some(two_weeks)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = ApiTestHelpers::json_body(response).await;
    let slots = body["data"].as_array().unwrap();
    assert_eq!(slots.len(), 8);
    assert!(slots.iter().all(|s| s["status"] == "available" && s["duration_minutes"] == 50));
}
