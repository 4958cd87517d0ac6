use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::{validate_reps, validate_video_url};

/// A workout routine. Routines without a student are reusable templates.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutRoutine {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub trainer_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub is_template: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutExercise {
    pub id: Uuid,
    pub routine_id: Uuid,
    pub position: i32,
    pub name: String,
    pub sets: i32,
    pub reps: String,
    pub weight_kg: Option<f64>,
    pub rest_seconds: Option<i32>,
    pub video_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutineWithExercises {
    #[serde(flatten)]
    pub routine: WorkoutRoutine,
    pub exercises: Vec<WorkoutExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExerciseInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, max = 20))]
    pub sets: i32,
    #[validate(custom(function = "validate_reps"))]
    pub reps: String,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub weight_kg: Option<f64>,
    #[validate(range(min = 0, max = 900))]
    pub rest_seconds: Option<i32>,
    #[validate(custom(function = "validate_video_url"))]
    pub video_url: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Create a routine. Leaving `student_id` empty stores a reusable template.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoutineRequest {
    pub student_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50), nested)]
    pub exercises: Vec<ExerciseInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoutineRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    /// When present, replaces the routine's exercises wholesale
    #[validate(length(min = 1, max = 50), nested)]
    pub exercises: Option<Vec<ExerciseInput>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTemplateRequest {
    pub student_id: Uuid,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoutineQuery {
    pub student_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub routine_id: Uuid,
    pub student_id: Uuid,
    pub client_log_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub perceived_effort: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Completion log. `client_log_id` is generated on the device so a retried
/// offline save does not create a second entry.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkoutLogRequest {
    pub client_log_id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 1, max = 10))]
    pub perceived_effort: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}
