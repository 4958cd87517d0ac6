use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, OrNotFound};
use crate::api::extract::ValidatedJson;
use crate::api::response::{ApiResponse, Deleted};
use crate::auth::{jwt_auth_middleware, staff_only_middleware, AuthService, UserSession};
use crate::models::{
    AutoMessageTemplate, CreateAutoMessageRequest, SendAutoMessageRequest, SendAutoMessageResult,
    UpdateAutoMessageRequest,
};
use crate::services::AutoMessageService;

#[derive(Clone)]
pub struct AutoMessagesAppState {
    pub auto_messages: AutoMessageService,
}

pub fn auto_message_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = AutoMessagesAppState {
        auto_messages: AutoMessageService::new(db),
    };

    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/:template_id", put(update_template).delete(delete_template))
        .route("/:template_id/send", post(send_template))
        .route_layer(middleware::from_fn(staff_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_templates(
    State(state): State<AutoMessagesAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Vec<AutoMessageTemplate>>>> {
    let tenant_id = session.require_staff()?;
    Ok(ApiResponse::ok(state.auto_messages.list(tenant_id).await?))
}

async fn create_template(
    State(state): State<AutoMessagesAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<CreateAutoMessageRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AutoMessageTemplate>>)> {
    let tenant_id = session.require_staff()?;
    Ok(ApiResponse::created(state.auto_messages.create(tenant_id, &request).await?))
}

async fn update_template(
    State(state): State<AutoMessagesAppState>,
    session: UserSession,
    Path(template_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateAutoMessageRequest>,
) -> ApiResult<Json<ApiResponse<AutoMessageTemplate>>> {
    let tenant_id = session.require_staff()?;
    let template = state
        .auto_messages
        .update(tenant_id, template_id, &request)
        .await?
        .or_not_found("Auto-message")?;
    Ok(ApiResponse::ok(template))
}

async fn delete_template(
    State(state): State<AutoMessagesAppState>,
    session: UserSession,
    Path(template_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    let tenant_id = session.require_staff()?;
    state
        .auto_messages
        .delete(tenant_id, template_id)
        .await?
        .then_some(())
        .or_not_found("Auto-message")?;
    Ok(ApiResponse::ok(Deleted { id: template_id }))
}

#[tracing::instrument(skip_all, fields(%template_id, recipients = request.student_ids.len()))]
async fn send_template(
    State(state): State<AutoMessagesAppState>,
    session: UserSession,
    Path(template_id): Path<Uuid>,
    Json(request): Json<SendAutoMessageRequest>,
) -> ApiResult<Json<ApiResponse<SendAutoMessageResult>>> {
    let tenant_id = session.require_staff()?;
    if request.student_ids.is_empty() {
        return Err(ApiError::BadRequest("Select at least one student".to_string()));
    }

    let result = state
        .auto_messages
        .send(tenant_id, template_id, session.user_id, &request.student_ids)
        .await?
        .or_not_found("Auto-message")?;
    Ok(ApiResponse::ok(result))
}
