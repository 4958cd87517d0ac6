use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiResult, OrNotFound};
use crate::api::extract::ValidatedJson;
use crate::api::response::ApiResponse;
use crate::auth::{jwt_auth_middleware, student_only_middleware, AuthService, UserSession};
use crate::models::{
    AssessmentHistory, CreateWorkoutLogRequest, RoutineWithExercises, ScheduleSlot, Student, WorkoutLog,
};
use crate::services::{AssessmentService, ScheduleService, StudentService, WorkoutService};

#[derive(Clone)]
pub struct MeAppState {
    pub students: StudentService,
    pub workouts: WorkoutService,
    pub assessments: AssessmentService,
    pub schedule: ScheduleService,
}

impl MeAppState {
    /// Student record linked to the signed-in account
    async fn current_student(&self, session: &UserSession) -> ApiResult<(Uuid, Student)> {
        let tenant_id = session.require_student()?;
        let student = self
            .students
            .find_by_user(tenant_id, session.user_id)
            .await?
            .or_not_found("Student")?;
        Ok((tenant_id, student))
    }
}

/// The student app
pub fn me_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = MeAppState {
        students: StudentService::new(db.clone(), auth_service.clone()),
        workouts: WorkoutService::new(db.clone()),
        assessments: AssessmentService::new(db.clone()),
        schedule: ScheduleService::new(db),
    };

    Router::new()
        .route("/", get(my_profile))
        .route("/workouts", get(my_workouts))
        .route("/workouts/:routine_id/logs", get(my_workout_logs).post(log_workout))
        .route("/assessments", get(my_assessments))
        .route("/slots", get(my_slots))
        .route("/slots/available", get(available_slots))
        .route_layer(middleware::from_fn(student_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn my_profile(
    State(state): State<MeAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Student>>> {
    let (_, student) = state.current_student(&session).await?;
    Ok(ApiResponse::ok(student))
}

async fn my_workouts(
    State(state): State<MeAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Vec<RoutineWithExercises>>>> {
    let (tenant_id, student) = state.current_student(&session).await?;
    Ok(ApiResponse::ok(state.workouts.list_for_student(tenant_id, student.id).await?))
}

async fn my_workout_logs(
    State(state): State<MeAppState>,
    session: UserSession,
    Path(routine_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<WorkoutLog>>>> {
    let (tenant_id, student) = state.current_student(&session).await?;
    Ok(ApiResponse::ok(
        state.workouts.list_logs(tenant_id, student.id, Some(routine_id)).await?,
    ))
}

/// Safe to retry with the same `client_log_id`
#[tracing::instrument(skip_all, fields(%routine_id, client_log_id = %request.client_log_id))]
async fn log_workout(
    State(state): State<MeAppState>,
    session: UserSession,
    Path(routine_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateWorkoutLogRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<WorkoutLog>>)> {
    let (tenant_id, student) = state.current_student(&session).await?;
    let log = state
        .workouts
        .log_workout(tenant_id, student.id, routine_id, &request)
        .await?
        .or_not_found("Workout")?;
    Ok(ApiResponse::created(log))
}

async fn my_assessments(
    State(state): State<MeAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<AssessmentHistory>>> {
    let (tenant_id, student) = state.current_student(&session).await?;
    let history = state
        .assessments
        .list_for_student(tenant_id, student.id)
        .await?
        .or_not_found("Student")?;
    Ok(ApiResponse::ok(history))
}

async fn my_slots(
    State(state): State<MeAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Vec<ScheduleSlot>>>> {
    let (tenant_id, student) = state.current_student(&session).await?;
    let today = Utc::now().date_naive();
    Ok(ApiResponse::ok(
        state.schedule.list_for_student(tenant_id, student.id, today).await?,
    ))
}

async fn available_slots(
    State(state): State<MeAppState>,
    session: UserSession,
) -> ApiResult<Json<ApiResponse<Vec<ScheduleSlot>>>> {
    let (tenant_id, _) = state.current_student(&session).await?;
    let today = Utc::now().date_naive();
    Ok(ApiResponse::ok(state.schedule.list_available(tenant_id, today).await?))
}
