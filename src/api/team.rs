use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;

use crate::api::error::ApiResult;
use crate::api::extract::ValidatedJson;
use crate::api::response::ApiResponse;
use crate::auth::{admin_only_middleware, jwt_auth_middleware, AuthService, UserSession};
use crate::models::{InviteUserRequest, UserResponse};
use crate::services::UserService;

#[derive(Clone)]
pub struct TeamAppState {
    pub users: UserService,
}

/// Tenant team management, tenant admins only
pub fn team_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = TeamAppState {
        users: UserService::new(db, auth_service.clone()),
    };

    Router::new()
        .route("/", get(list_team))
        .route("/invite", post(invite_member))
        .route_layer(middleware::from_fn(admin_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_team(
    State(state): State<TeamAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let tenant_id = session.require_admin()?;
    Ok(ApiResponse::ok(state.users.list_team(tenant_id).await?))
}

#[tracing::instrument(skip_all, fields(actor = %session.user_id, role = ?request.role))]
async fn invite_member(
    State(state): State<TeamAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<InviteUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let tenant_id = session.require_admin()?;
    let user = state
        .users
        .invite_team_member(tenant_id, session.user_id, &request)
        .await?;
    Ok(ApiResponse::created(user))
}
