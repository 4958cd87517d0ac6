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
use crate::api::response::{ApiResponse, Deleted};
use crate::auth::{jwt_auth_middleware, staff_only_middleware, AuthService, UserSession};
use crate::models::{
    AssignTemplateRequest, CreateRoutineRequest, RoutineQuery, RoutineWithExercises, UpdateRoutineRequest,
    WorkoutRoutine,
};
use crate::services::WorkoutService;

#[derive(Clone)]
pub struct WorkoutsAppState {
    pub workouts: WorkoutService,
}

/// Routine authoring and templates, tenant staff only
pub fn workout_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = WorkoutsAppState {
        workouts: WorkoutService::new(db),
    };

    Router::new()
        .route("/", get(list_routines).post(create_routine))
        .route("/templates", get(list_templates))
        .route("/:routine_id", get(get_routine).put(update_routine).delete(delete_routine))
        .route("/:routine_id/assign", post(assign_template))
        .route_layer(middleware::from_fn(staff_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_routines(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    Query(query): Query<RoutineQuery>,
) -> ApiResult<Json<ApiResponse<Vec<WorkoutRoutine>>>> {
    let tenant_id = session.require_staff()?;
    Ok(ApiResponse::ok(state.workouts.list_routines(tenant_id, &query).await?))
}

async fn list_templates(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Vec<WorkoutRoutine>>>> {
    let tenant_id = session.require_staff()?;
    Ok(ApiResponse::ok(state.workouts.list_templates(tenant_id).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn create_routine(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<CreateRoutineRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RoutineWithExercises>>)> {
    let tenant_id = session.require_staff()?;
    let routine = state
        .workouts
        .create_routine(tenant_id, session.user_id, &request)
        .await?;
    Ok(ApiResponse::created(routine))
}

async fn get_routine(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    Path(routine_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<RoutineWithExercises>>> {
    let tenant_id = session.require_staff()?;
    let routine = state
        .workouts
        .get_routine(tenant_id, routine_id)
        .await?
        .or_not_found("Workout")?;
    Ok(ApiResponse::ok(routine))
}

async fn update_routine(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    Path(routine_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateRoutineRequest>,
) -> ApiResult<Json<ApiResponse<RoutineWithExercises>>> {
    let tenant_id = session.require_staff()?;
    let routine = state
        .workouts
        .update_routine(tenant_id, routine_id, &request)
        .await?
        .or_not_found("Workout")?;
    Ok(ApiResponse::ok(routine))
}

async fn delete_routine(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    Path(routine_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    let tenant_id = session.require_staff()?;
    state
        .workouts
        .delete_routine(tenant_id, routine_id)
        .await?
        .then_some(())
        .or_not_found("Workout")?;
    Ok(ApiResponse::ok(Deleted { id: routine_id }))
}

/// Copy a template onto a student
#[tracing::instrument(skip_all, fields(%routine_id, student_id = %request.student_id))]
async fn assign_template(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    Path(routine_id): Path<Uuid>,
    Json(request): Json<AssignTemplateRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RoutineWithExercises>>)> {
    let tenant_id = session.require_staff()?;
    let routine = state
        .workouts
        .assign_template(tenant_id, routine_id, session.user_id, &request)
        .await?
        .or_not_found("Template")?;
    Ok(ApiResponse::created(routine))
}
