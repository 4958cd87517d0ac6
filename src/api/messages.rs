use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiResult, OrNotFound};
use crate::api::extract::ValidatedJson;
use crate::api::response::ApiResponse;
use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::models::{Conversation, Message, MessagesQuery, SendMessageRequest, StartConversationRequest};
use crate::services::MessageService;

#[derive(Clone)]
pub struct MessagesAppState {
    pub messages: MessageService,
}

/// Trainer/student chat for any tenant user
pub fn conversation_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = MessagesAppState {
        messages: MessageService::new(db),
    };

    Router::new()
        .route("/", get(list_conversations).post(start_conversation))
        .route("/:conversation_id/messages", get(list_messages).post(send_message))
        .route("/:conversation_id/read", post(mark_read))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_conversations(
    State(state): State<MessagesAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Vec<Conversation>>>> {
    let tenant_id = session.tenant_id()?;
    Ok(ApiResponse::ok(
        state.messages.list_conversations(tenant_id, session.user_id).await?,
    ))
}

async fn start_conversation(
    State(state): State<MessagesAppState>,
    session: UserSession,
    Json(request): Json<StartConversationRequest>,
) -> ApiResult<Json<ApiResponse<Conversation>>> {
    let tenant_id = session.tenant_id()?;
    let conversation = state
        .messages
        .start_conversation(tenant_id, session.user_id, session.role, request.participant_id)
        .await?;
    Ok(ApiResponse::ok(conversation))
}

/// Polled by clients with `after` set to the newest message they hold
async fn list_messages(
    State(state): State<MessagesAppState>,
    session: UserSession,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Message>>>> {
    let tenant_id = session.tenant_id()?;
    let messages = state
        .messages
        .list_messages(tenant_id, conversation_id, session.user_id, &query)
        .await?
        .or_not_found("Conversation")?;
    Ok(ApiResponse::ok(messages))
}

#[tracing::instrument(skip_all, fields(%conversation_id, sender = %session.user_id))]
async fn send_message(
    State(state): State<MessagesAppState>,
    session: UserSession,
    Path(conversation_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Message>>)> {
    let tenant_id = session.tenant_id()?;
    let message = state
        .messages
        .send_message(tenant_id, conversation_id, session.user_id, &request.body)
        .await?
        .or_not_found("Conversation")?;
    Ok(ApiResponse::created(message))
}

async fn mark_read(
    State(state): State<MessagesAppState>,
    session: UserSession,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Conversation>>> {
    let tenant_id = session.tenant_id()?;
    let conversation = state
        .messages
        .mark_read(tenant_id, conversation_id, session.user_id)
        .await?
        .or_not_found("Conversation")?;
    Ok(ApiResponse::ok(conversation))
}
