use axum::{extract::State, middleware, routing::get, Json, Router};

use crate::api::error::ApiResult;
use crate::api::response::ApiResponse;
use crate::auth::{jwt_auth_middleware, staff_only_middleware, AuthService, UserSession};
use crate::models::TenantDashboard;
use crate::services::DashboardService;

pub fn dashboard_routes(dashboard: DashboardService, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(tenant_dashboard))
        .route_layer(middleware::from_fn(staff_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(dashboard)
}

async fn tenant_dashboard(
    State(dashboard): State<DashboardService>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<TenantDashboard>>> {
    let tenant_id = session.require_staff()?;
    Ok(ApiResponse::ok(
        dashboard.tenant_dashboard(tenant_id, session.user_id).await?,
    ))
}
