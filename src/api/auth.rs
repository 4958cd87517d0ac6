use axum::{extract::State, middleware, routing::{get, post}, Json, Router};

use crate::api::error::ApiResult;
use crate::api::response::ApiResponse;
use crate::api::extract::ValidatedJson;
use crate::auth::{
    jwt_auth_middleware, login_rate_limit_middleware, AuthResponse, AuthService, ChangePasswordRequest,
    ForgotPasswordRequest, LoginRequest, MessageResponse, RateLimiter, RefreshTokenRequest,
    ResetPasswordRequest, TokenResponse, UserSession,
};
use crate::models::UserResponse;

/// Authentication routes
pub fn auth_routes(auth_service: AuthService, login_limiter: RateLimiter) -> Router {
    let public = Router::new()
        .route(
            "/login",
            post(login).route_layer(middleware::from_fn_with_state(login_limiter, login_rate_limit_middleware)),
        )
        .route("/refresh", post(refresh_token))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password));

    let authenticated = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(get_profile))
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(auth_service.clone(), jwt_auth_middleware));

    public.merge(authenticated).with_state(auth_service)
}

#[tracing::instrument(skip_all)]
async fn login(
    State(auth_service): State<AuthService>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let response = auth_service.login(request).await?;
    Ok(ApiResponse::ok(response))
}

#[tracing::instrument(skip_all)]
async fn refresh_token(
    State(auth_service): State<AuthService>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let response = auth_service.refresh_token(request).await?;
    Ok(ApiResponse::ok(response))
}

#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn logout(
    State(auth_service): State<AuthService>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let response = auth_service.logout(&session).await?;
    Ok(ApiResponse::ok(response))
}

async fn get_profile(
    State(auth_service): State<AuthService>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let profile = auth_service.profile(&session).await?;
    Ok(ApiResponse::ok(profile))
}

#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn change_password(
    State(auth_service): State<AuthService>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let response = auth_service.change_password(&session, request).await?;
    Ok(ApiResponse::ok(response))
}

/// Always answers with the same message so account existence is not revealed
#[tracing::instrument(skip_all)]
async fn forgot_password(
    State(auth_service): State<AuthService>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let response = auth_service.forgot_password(&request.email).await?;
    Ok(ApiResponse::ok(response))
}

#[tracing::instrument(skip_all)]
async fn reset_password(
    State(auth_service): State<AuthService>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let response = auth_service.reset_password(request).await?;
    Ok(ApiResponse::ok(response))
}
