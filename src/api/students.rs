use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiResult, OrNotFound};
use crate::api::extract::ValidatedJson;
use crate::api::response::{ApiResponse, Deleted};
use crate::auth::{jwt_auth_middleware, staff_only_middleware, AuthService, UserSession};
use crate::models::{
    AssessmentHistory, AssessmentResponse, CreateAssessmentRequest, CreateStudentRequest, Page, Student,
    StudentQuery, UpdateStudentRequest, UpdateStudentStatusRequest,
};
use crate::services::{AssessmentService, StudentService};

#[derive(Clone)]
pub struct StudentsAppState {
    pub students: StudentService,
    pub assessments: AssessmentService,
}

/// Student records and their assessments, tenant staff only
pub fn student_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = StudentsAppState {
        students: StudentService::new(db.clone(), auth_service.clone()),
        assessments: AssessmentService::new(db),
    };

    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/:student_id", get(get_student).put(update_student).delete(delete_student))
        .route("/:student_id/status", put(update_status))
        .route("/:student_id/restore", post(restore_student))
        .route("/:student_id/invite", post(invite_student))
        .route("/:student_id/assessments", get(list_assessments).post(create_assessment))
        .route_layer(middleware::from_fn(staff_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_students(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Query(query): Query<StudentQuery>,
) -> ApiResult<Json<ApiResponse<Page<Student>>>> {
    let tenant_id = session.require_staff()?;
    Ok(ApiResponse::ok(state.students.list(tenant_id, &query).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn create_student(
    State(state): State<StudentsAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<CreateStudentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Student>>)> {
    let tenant_id = session.require_staff()?;
    let student = state
        .students
        .create(tenant_id, session.user_id, session.role, &request)
        .await?;
    Ok(ApiResponse::created(student))
}

async fn get_student(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Student>>> {
    let tenant_id = session.require_staff()?;
    let student = state.students.get(tenant_id, student_id).await?.or_not_found("Student")?;
    Ok(ApiResponse::ok(student))
}

async fn update_student(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateStudentRequest>,
) -> ApiResult<Json<ApiResponse<Student>>> {
    let tenant_id = session.require_staff()?;
    let student = state
        .students
        .update(tenant_id, student_id, &request)
        .await?
        .or_not_found("Student")?;
    Ok(ApiResponse::ok(student))
}

async fn update_status(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
    Json(request): Json<UpdateStudentStatusRequest>,
) -> ApiResult<Json<ApiResponse<Student>>> {
    let tenant_id = session.require_staff()?;
    let student = state
        .students
        .set_status(tenant_id, student_id, request.status)
        .await?
        .or_not_found("Student")?;
    Ok(ApiResponse::ok(student))
}

/// Soft delete; the record can be restored
async fn delete_student(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    let tenant_id = session.require_staff()?;
    state
        .students
        .soft_delete(tenant_id, student_id)
        .await?
        .then_some(())
        .or_not_found("Student")?;
    Ok(ApiResponse::ok(Deleted { id: student_id }))
}

async fn restore_student(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Student>>> {
    let tenant_id = session.require_staff()?;
    let student = state
        .students
        .restore(tenant_id, student_id)
        .await?
        .or_not_found("Student")?;
    Ok(ApiResponse::ok(student))
}

/// Create the student's login account and mail the invitation
#[tracing::instrument(skip_all, fields(%student_id))]
async fn invite_student(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Student>>> {
    let tenant_id = session.require_staff()?;
    let student = state
        .students
        .invite(tenant_id, student_id)
        .await?
        .or_not_found("Student")?;
    Ok(ApiResponse::ok(student))
}

async fn list_assessments(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<AssessmentHistory>>> {
    let tenant_id = session.require_staff()?;
    let history = state
        .assessments
        .list_for_student(tenant_id, student_id)
        .await?
        .or_not_found("Student")?;
    Ok(ApiResponse::ok(history))
}

#[tracing::instrument(skip_all, fields(%student_id))]
async fn create_assessment(
    State(state): State<StudentsAppState>,
    session: UserSession,
    Path(student_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateAssessmentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AssessmentResponse>>)> {
    let tenant_id = session.require_staff()?;
    let response = state
        .assessments
        .create(tenant_id, student_id, session.user_id, &request)
        .await?
        .or_not_found("Student")?;
    Ok(ApiResponse::created(response))
}
