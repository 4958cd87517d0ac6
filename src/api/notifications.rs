use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiResult, OrNotFound};
use crate::api::response::ApiResponse;
use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::models::{Notification, NotificationQuery, UnreadCount};
use crate::services::NotificationService;

#[derive(Clone)]
pub struct NotificationsAppState {
    pub notifications: NotificationService,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// The caller's own notifications
pub fn notification_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = NotificationsAppState {
        notifications: NotificationService::new(db),
    };

    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:notification_id/read", post(mark_read))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_notifications(
    State(state): State<NotificationsAppState>,
    session: UserSession,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Notification>>>> {
    Ok(ApiResponse::ok(state.notifications.list(session.user_id, &query).await?))
}

async fn unread_count(
    State(state): State<NotificationsAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<UnreadCount>>> {
    let unread = state.notifications.unread_count(session.user_id).await?;
    Ok(ApiResponse::ok(UnreadCount { unread }))
}

async fn mark_read(
    State(state): State<NotificationsAppState>,
    session: UserSession,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let notification = state
        .notifications
        .mark_read(session.user_id, notification_id)
        .await?
        .or_not_found("Notification")?;
    Ok(ApiResponse::ok(notification))
}

async fn mark_all_read(
    State(state): State<NotificationsAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<MarkedRead>>> {
    let updated = state.notifications.mark_all_read(session.user_id).await?;
    Ok(ApiResponse::ok(MarkedRead { updated }))
}
