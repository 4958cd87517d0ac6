use axum::{
    extract::{Query, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::error::{ApiResult, OrNotFound};
use crate::api::response::ApiResponse;
use crate::auth::{jwt_auth_middleware, staff_only_middleware, AuthService, UserSession};
use crate::models::{BillingPortalResponse, Invoice, InvoiceQuery, InvoiceStatus, Page, SubscriptionDetails};
use crate::services::BillingService;

#[derive(Clone)]
pub struct BillingAppState {
    pub billing: BillingService,
}

/// Invoice filter available to a tenant. The tenant comes from the session.
#[derive(Debug, Default, Deserialize)]
pub struct TenantInvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// The tenant's own subscription, invoices and billing portal link
pub fn billing_routes(billing: BillingService, auth_service: AuthService) -> Router {
    let state = BillingAppState { billing };

    Router::new()
        .route("/subscription", get(get_subscription))
        .route("/invoices", get(list_invoices))
        .route("/portal", get(portal))
        .route_layer(middleware::from_fn(staff_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn get_subscription(
    State(state): State<BillingAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<SubscriptionDetails>>> {
    let tenant_id = session.require_staff()?;
    let details = state
        .billing
        .subscription_for_tenant(tenant_id)
        .await?
        .or_not_found("Subscription")?;
    Ok(ApiResponse::ok(details))
}

async fn list_invoices(
    State(state): State<BillingAppState>,
    session: UserSession,
    Query(query): Query<TenantInvoiceQuery>,
) -> ApiResult<Json<ApiResponse<Page<Invoice>>>> {
    let tenant_id = session.require_staff()?;
    let query = InvoiceQuery {
        tenant_id: Some(tenant_id),
        status: query.status,
        limit: query.limit,
        offset: query.offset,
    };
    Ok(ApiResponse::ok(state.billing.list_invoices(&query).await?))
}

/// Payment management happens on the provider's hosted portal
async fn portal(
    State(state): State<BillingAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<BillingPortalResponse>>> {
    let tenant_id = session.require_staff()?;
    Ok(ApiResponse::ok(BillingPortalResponse {
        url: state.billing.portal_url(tenant_id),
    }))
}
