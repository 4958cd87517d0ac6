use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiResult, OrNotFound};
use crate::api::response::ApiResponse;
use crate::api::extract::ValidatedJson;
use crate::auth::{jwt_auth_middleware, super_admin_only_middleware, AuthService, UserSession};
use crate::models::{
    actions, AuditLog, AuditLogQuery, ChangeSubscriptionRequest, CreatePlanRequest, CreateTenantRequest, Invoice,
    InvoiceQuery, NewAuditEntry, Page, Plan, PlatformOverview, ProvisionedTenant, SubscriptionDetails, Tenant,
    TenantQuery, UpdateTenantRequest, UpdateTenantStatusRequest,
};
use crate::services::{AuditService, BillingService, DashboardService, TenantService};

#[derive(Clone)]
pub struct AdminAppState {
    pub tenants: TenantService,
    pub billing: BillingService,
    pub audit: AuditService,
    pub dashboard: DashboardService,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Platform back office, super-admin only
pub fn admin_routes(db: PgPool, auth_service: AuthService, billing: BillingService) -> Router {
    let state = AdminAppState {
        tenants: TenantService::new(db.clone(), auth_service.clone()),
        audit: AuditService::new(db.clone()),
        dashboard: DashboardService::new(db, billing.clone()),
        billing,
    };

    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route("/tenants/:tenant_id", get(get_tenant).put(update_tenant))
        .route("/tenants/:tenant_id/status", put(change_tenant_status))
        .route("/tenants/:tenant_id/subscription", put(change_subscription))
        .route("/plans", get(list_plans).post(create_plan))
        .route("/invoices", get(list_invoices))
        .route("/audit-logs", get(list_audit_logs))
        .route("/overview", get(overview))
        .route_layer(middleware::from_fn(super_admin_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_tenants(
    State(state): State<AdminAppState>,
    Query(query): Query<TenantQuery>,
) -> ApiResult<Json<ApiResponse<Page<Tenant>>>> {
    Ok(ApiResponse::ok(state.tenants.list(&query).await?))
}

/// Provision a tenant with its owner account and trial subscription
#[tracing::instrument(skip_all, fields(actor = %session.user_id))]
async fn create_tenant(
    State(state): State<AdminAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProvisionedTenant>>)> {
    let provisioned = state.tenants.provision(session.user_id, &request).await?;
    Ok(ApiResponse::created(provisioned))
}

async fn get_tenant(
    State(state): State<AdminAppState>,
    Path(tenant_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Tenant>>> {
    let tenant = state.tenants.get(tenant_id).await?.or_not_found("Tenant")?;
    Ok(ApiResponse::ok(tenant))
}

async fn update_tenant(
    State(state): State<AdminAppState>,
    session: UserSession,
    Path(tenant_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateTenantRequest>,
) -> ApiResult<Json<ApiResponse<Tenant>>> {
    let tenant = state
        .tenants
        .update(session.user_id, tenant_id, &request)
        .await?
        .or_not_found("Tenant")?;
    Ok(ApiResponse::ok(tenant))
}

#[tracing::instrument(skip_all, fields(%tenant_id, status = ?request.status))]
async fn change_tenant_status(
    State(state): State<AdminAppState>,
    session: UserSession,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<UpdateTenantStatusRequest>,
) -> ApiResult<Json<ApiResponse<Tenant>>> {
    let tenant = state
        .tenants
        .change_status(session.user_id, tenant_id, &request)
        .await?
        .or_not_found("Tenant")?;
    Ok(ApiResponse::ok(tenant))
}

async fn change_subscription(
    State(state): State<AdminAppState>,
    session: UserSession,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<ChangeSubscriptionRequest>,
) -> ApiResult<Json<ApiResponse<SubscriptionDetails>>> {
    let details = state
        .billing
        .change_subscription(tenant_id, &request)
        .await?
        .or_not_found("Subscription")?;

    state
        .audit
        .record(
            NewAuditEntry::new(actions::SUBSCRIPTION_CHANGED, "subscription")
                .actor(session.user_id)
                .tenant(tenant_id)
                .target(details.subscription.id)
                .details(json!({
                    "plan_id": details.plan.id,
                    "status": details.subscription.status,
                })),
        )
        .await?;

    Ok(ApiResponse::ok(details))
}

async fn list_plans(
    State(state): State<AdminAppState>,
    Query(query): Query<PlanQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Plan>>>> {
    Ok(ApiResponse::ok(state.billing.list_plans(query.include_inactive).await?))
}

async fn create_plan(
    State(state): State<AdminAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<CreatePlanRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Plan>>)> {
    let plan = state.billing.create_plan(&request).await?;

    state
        .audit
        .record(
            NewAuditEntry::new(actions::PLAN_CREATED, "plan")
                .actor(session.user_id)
                .target(plan.id)
                .details(json!({ "name": plan.name, "price_cents": plan.price_cents })),
        )
        .await?;

    Ok(ApiResponse::created(plan))
}

async fn list_invoices(
    State(state): State<AdminAppState>,
    Query(query): Query<InvoiceQuery>,
) -> ApiResult<Json<ApiResponse<Page<Invoice>>>> {
    Ok(ApiResponse::ok(state.billing.list_invoices(&query).await?))
}

async fn list_audit_logs(
    State(state): State<AdminAppState>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<ApiResponse<Page<AuditLog>>>> {
    Ok(ApiResponse::ok(state.audit.list(&query).await?))
}

async fn overview(State(state): State<AdminAppState>) -> ApiResult<Json<ApiResponse<PlatformOverview>>> {
    Ok(ApiResponse::ok(state.dashboard.platform_overview().await?))
}
