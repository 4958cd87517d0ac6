use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, OrNotFound};
use crate::api::extract::ValidatedJson;
use crate::api::response::{ApiResponse, Deleted};
use crate::auth::{jwt_auth_middleware, staff_only_middleware, student_only_middleware, AuthService, UserSession};
use crate::models::{
    CreateSlotRequest, DraftSlot, RecurringPreview, RecurringSlotRequest, ScheduleSlot, SlotQuery,
    UpdateSlotStatusRequest,
};
use crate::services::recurring_schedule::{generate_recurring_slots, range_days, MAX_RECURRING_RANGE_DAYS};
use crate::services::{ScheduleService, StudentService};

#[derive(Clone)]
pub struct ScheduleAppState {
    pub schedule: ScheduleService,
    pub students: StudentService,
}

/// Staff manage availability; students book and cancel.
pub fn schedule_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = ScheduleAppState {
        schedule: ScheduleService::new(db.clone()),
        students: StudentService::new(db, auth_service.clone()),
    };

    let staff = Router::new()
        .route("/slots", get(list_slots).post(create_slot))
        .route("/slots/:slot_id", delete(delete_slot))
        .route("/slots/:slot_id/status", put(update_slot_status))
        .route("/recurring/preview", post(preview_recurring))
        .route("/recurring", post(create_recurring))
        .route_layer(middleware::from_fn(staff_only_middleware));

    let student = Router::new()
        .route("/slots/:slot_id/book", post(book_slot))
        .route("/slots/:slot_id/cancel", post(cancel_booking))
        .route_layer(middleware::from_fn(student_only_middleware));

    staff
        .merge(student)
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

/// Expand a recurring request, enforcing the range cap
fn recurring_drafts(request: &RecurringSlotRequest) -> ApiResult<Vec<DraftSlot>> {
    if range_days(request.start_date, request.end_date) > MAX_RECURRING_RANGE_DAYS {
        return Err(ApiError::Unprocessable(format!(
            "Recurring schedules can cover at most {MAX_RECURRING_RANGE_DAYS} days"
        )));
    }
    Ok(generate_recurring_slots(request))
}

async fn list_slots(
    State(state): State<ScheduleAppState>,
    session: UserSession,
    Query(query): Query<SlotQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ScheduleSlot>>>> {
    let tenant_id = session.require_staff()?;
    if query.from > query.to {
        return Err(ApiError::BadRequest("`from` must not be after `to`".to_string()));
    }
    Ok(ApiResponse::ok(state.schedule.list_slots(tenant_id, &query).await?))
}

async fn create_slot(
    State(state): State<ScheduleAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<CreateSlotRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ScheduleSlot>>)> {
    let tenant_id = session.require_staff()?;
    let slot = state.schedule.create_slot(tenant_id, session.user_id, &request).await?;
    Ok(ApiResponse::created(slot))
}

async fn preview_recurring(
    session: UserSession,
    ValidatedJson(request): ValidatedJson<RecurringSlotRequest>,
) -> ApiResult<Json<ApiResponse<RecurringPreview>>> {
    session.require_staff()?;
    let slots = recurring_drafts(&request)?;
    Ok(ApiResponse::ok(RecurringPreview {
        count: slots.len(),
        slots,
    }))
}

/// Persist every generated slot, or none when nothing matches
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn create_recurring(
    State(state): State<ScheduleAppState>,
    session: UserSession,
    ValidatedJson(request): ValidatedJson<RecurringSlotRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Vec<ScheduleSlot>>>)> {
    let tenant_id = session.require_staff()?;
    let drafts = recurring_drafts(&request)?;
    if drafts.is_empty() {
        return Err(ApiError::Unprocessable(
            "No slots match the selected days and times".to_string(),
        ));
    }

    let trainer_id = request.trainer_id.unwrap_or(session.user_id);
    let slots = state.schedule.create_slots_batch(tenant_id, trainer_id, &drafts).await?;
    Ok(ApiResponse::created(slots))
}

async fn update_slot_status(
    State(state): State<ScheduleAppState>,
    session: UserSession,
    Path(slot_id): Path<Uuid>,
    Json(request): Json<UpdateSlotStatusRequest>,
) -> ApiResult<Json<ApiResponse<ScheduleSlot>>> {
    let tenant_id = session.require_staff()?;
    let slot = state
        .schedule
        .update_status(tenant_id, slot_id, &request)
        .await?
        .or_not_found("Slot")?;
    Ok(ApiResponse::ok(slot))
}

async fn delete_slot(
    State(state): State<ScheduleAppState>,
    session: UserSession,
    Path(slot_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    let tenant_id = session.require_staff()?;
    state
        .schedule
        .delete_slot(tenant_id, slot_id)
        .await?
        .then_some(())
        .or_not_found("Slot")?;
    Ok(ApiResponse::ok(Deleted { id: slot_id }))
}

async fn book_slot(
    State(state): State<ScheduleAppState>,
    session: UserSession,
    Path(slot_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ScheduleSlot>>> {
    let tenant_id = session.require_student()?;
    let student = state
        .students
        .find_by_user(tenant_id, session.user_id)
        .await?
        .or_not_found("Student")?;

    let slot = state
        .schedule
        .book_slot(tenant_id, student.id, slot_id)
        .await?
        .or_not_found("Slot")?;
    Ok(ApiResponse::ok(slot))
}

async fn cancel_booking(
    State(state): State<ScheduleAppState>,
    session: UserSession,
    Path(slot_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ScheduleSlot>>> {
    let tenant_id = session.require_student()?;
    let student = state
        .students
        .find_by_user(tenant_id, session.user_id)
        .await?
        .or_not_found("Student")?;

    let slot = state
        .schedule
        .cancel_booking(tenant_id, student.id, slot_id)
        .await?
        .or_not_found("Slot")?;
    Ok(ApiResponse::ok(slot))
}
