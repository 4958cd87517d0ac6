use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiResult, OrNotFound};
use crate::api::extract::ValidatedJson;
use crate::api::response::{ApiResponse, Deleted};
use crate::auth::{jwt_auth_middleware, staff_only_middleware, AuthService, UserSession};
use crate::models::{AssessmentPreviewRequest, AssessmentResponse, IdealWeightRequest};
use crate::services::body_composition::{calculate_ideal_weight, AssessmentMetrics, IdealWeight, Measurements};
use crate::services::AssessmentService;

#[derive(Clone)]
pub struct AssessmentsAppState {
    pub assessments: AssessmentService,
}

#[derive(Debug, Serialize)]
pub struct IdealWeightResponse {
    pub height_cm: f64,
    #[serde(flatten)]
    pub range: IdealWeight,
}

/// Calculators for any signed-in user, stored assessments for staff
pub fn assessment_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = AssessmentsAppState {
        assessments: AssessmentService::new(db),
    };

    let calculators = Router::new()
        .route("/preview", post(preview))
        .route("/ideal-weight", post(ideal_weight));

    let records = Router::new()
        .route("/:assessment_id", get(get_assessment).delete(delete_assessment))
        .route_layer(middleware::from_fn(staff_only_middleware));

    calculators
        .merge(records)
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

/// Metrics for unsaved measurements, as shown while filling the form
async fn preview(
    ValidatedJson(request): ValidatedJson<AssessmentPreviewRequest>,
) -> ApiResult<Json<ApiResponse<AssessmentMetrics>>> {
    let measurements = Measurements {
        weight_kg: request.weight_kg,
        height_cm: request.height_cm,
        waist_cm: request.waist_cm,
        hip_cm: request.hip_cm,
        neck_cm: request.neck_cm,
    };
    Ok(ApiResponse::ok(AssessmentMetrics::compute(Some(request.gender), &measurements)))
}

async fn ideal_weight(
    ValidatedJson(request): ValidatedJson<IdealWeightRequest>,
) -> ApiResult<Json<ApiResponse<IdealWeightResponse>>> {
    Ok(ApiResponse::ok(IdealWeightResponse {
        height_cm: request.height_cm,
        range: calculate_ideal_weight(request.height_cm, request.gender),
    }))
}

async fn get_assessment(
    State(state): State<AssessmentsAppState>,
    session: UserSession,
    Path(assessment_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<AssessmentResponse>>> {
    let tenant_id = session.require_staff()?;
    let assessment = state
        .assessments
        .get(tenant_id, assessment_id)
        .await?
        .or_not_found("Assessment")?;
    Ok(ApiResponse::ok(assessment))
}

async fn delete_assessment(
    State(state): State<AssessmentsAppState>,
    session: UserSession,
    Path(assessment_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    let tenant_id = session.require_staff()?;
    state
        .assessments
        .delete(tenant_id, assessment_id)
        .await?
        .then_some(())
        .or_not_found("Assessment")?;
    Ok(ApiResponse::ok(Deleted { id: assessment_id }))
}
