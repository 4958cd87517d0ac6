use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    page_bounds, AssignTemplateRequest, CreateNotification, CreateRoutineRequest,
    CreateWorkoutLogRequest, ExerciseInput, NotificationType, RoutineQuery, RoutineWithExercises,
    UpdateRoutineRequest, WorkoutExercise, WorkoutLog, WorkoutRoutine,
};
use crate::services::{DomainError, NotificationService};

const ROUTINE_COLUMNS: &str = "id, tenant_id, trainer_id, student_id, name, description, is_template, deleted_at, created_at, updated_at";
const EXERCISE_COLUMNS: &str = "id, routine_id, position, name, sets, reps, weight_kg, rest_seconds, video_url, notes";
const LOG_COLUMNS: &str = "id, tenant_id, routine_id, student_id, client_log_id, completed_at, duration_minutes, perceived_effort, notes, created_at";

/// Workout routines, reusable templates and completion logs
#[derive(Clone)]
pub struct WorkoutService {
    db: PgPool,
    notifications: NotificationService,
}

impl WorkoutService {
    pub fn new(db: PgPool) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self { db, notifications }
    }

    /// Login account of a live student of the tenant, or `NotFound`
    async fn student_account(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Option<Uuid>> {
        let row: Option<Option<Uuid>> = sqlx::query_scalar(
            "SELECT user_id FROM students WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(student_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        row.ok_or_else(|| DomainError::NotFound("Student").into())
    }

    async fn insert_exercises(
        conn: &mut PgConnection,
        routine_id: Uuid,
        exercises: &[ExerciseInput],
    ) -> Result<Vec<WorkoutExercise>> {
        let mut inserted = Vec::with_capacity(exercises.len());

        for (position, exercise) in exercises.iter().enumerate() {
            let row = sqlx::query_as::<_, WorkoutExercise>(&format!(
                "INSERT INTO workout_exercises (routine_id, position, name, sets, reps, weight_kg, rest_seconds, video_url, notes)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 RETURNING {EXERCISE_COLUMNS}"
            ))
            .bind(routine_id)
            .bind(position as i32)
            .bind(exercise.name.trim())
            .bind(exercise.sets)
            .bind(exercise.reps.trim())
            .bind(exercise.weight_kg)
            .bind(exercise.rest_seconds)
            .bind(exercise.video_url.as_deref())
            .bind(exercise.notes.as_deref())
            .fetch_one(&mut *conn)
            .await?;

            inserted.push(row);
        }

        Ok(inserted)
    }

    async fn exercises_for(&self, routine_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<WorkoutExercise>>> {
        let rows = sqlx::query_as::<_, WorkoutExercise>(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM workout_exercises
             WHERE routine_id = ANY($1)
             ORDER BY routine_id, position"
        ))
        .bind(routine_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<WorkoutExercise>> = HashMap::new();
        for exercise in rows {
            grouped.entry(exercise.routine_id).or_default().push(exercise);
        }
        Ok(grouped)
    }

    async fn with_exercises(&self, routines: Vec<WorkoutRoutine>) -> Result<Vec<RoutineWithExercises>> {
        let ids: Vec<Uuid> = routines.iter().map(|r| r.id).collect();
        let mut exercises = self.exercises_for(&ids).await?;

        Ok(routines
            .into_iter()
            .map(|routine| RoutineWithExercises {
                exercises: exercises.remove(&routine.id).unwrap_or_default(),
                routine,
            })
            .collect())
    }

    async fn notify_assigned(&self, tenant_id: Uuid, student_user_id: Option<Uuid>, routine: &WorkoutRoutine) {
        if let Some(user_id) = student_user_id {
            self.notifications
                .notify(
                    CreateNotification::new(
                        Some(tenant_id),
                        user_id,
                        NotificationType::WorkoutAssigned,
                        "New workout",
                        format!("Your trainer assigned you \"{}\"", routine.name),
                    )
                    .with_link(format!("/me/workouts/{}", routine.id)),
                )
                .await;
        }
    }

    /// Create a routine for a student, or a template when no student is given
    pub async fn create_routine(
        &self,
        tenant_id: Uuid,
        trainer_id: Uuid,
        request: &CreateRoutineRequest,
    ) -> Result<RoutineWithExercises> {
        let student_user_id = match request.student_id {
            Some(student_id) => self.student_account(tenant_id, student_id).await?,
            None => None,
        };

        let mut tx = self.db.begin().await?;

        let routine = sqlx::query_as::<_, WorkoutRoutine>(&format!(
            "INSERT INTO workout_routines (tenant_id, trainer_id, student_id, name, description, is_template)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ROUTINE_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(trainer_id)
        .bind(request.student_id)
        .bind(request.name.trim())
        .bind(request.description.as_deref())
        .bind(request.student_id.is_none())
        .fetch_one(&mut *tx)
        .await?;

        let exercises = Self::insert_exercises(&mut *tx, routine.id, &request.exercises).await?;
        tx.commit().await?;

        info!(routine_id = %routine.id, template = routine.is_template, "Workout routine created");
        self.notify_assigned(tenant_id, student_user_id, &routine).await;

        Ok(RoutineWithExercises { routine, exercises })
    }

    pub async fn get_routine(&self, tenant_id: Uuid, routine_id: Uuid) -> Result<Option<RoutineWithExercises>> {
        let routine = sqlx::query_as::<_, WorkoutRoutine>(&format!(
            "SELECT {ROUTINE_COLUMNS} FROM workout_routines
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
        ))
        .bind(routine_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        match routine {
            Some(routine) => Ok(self.with_exercises(vec![routine]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Assigned (non-template) routines, optionally for one student
    pub async fn list_routines(&self, tenant_id: Uuid, query: &RoutineQuery) -> Result<Vec<WorkoutRoutine>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let routines = sqlx::query_as::<_, WorkoutRoutine>(&format!(
            "SELECT {ROUTINE_COLUMNS} FROM workout_routines
             WHERE tenant_id = $1 AND NOT is_template AND deleted_at IS NULL
               AND ($2::uuid IS NULL OR student_id = $2)
             ORDER BY updated_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(tenant_id)
        .bind(query.student_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(routines)
    }

    pub async fn list_templates(&self, tenant_id: Uuid) -> Result<Vec<WorkoutRoutine>> {
        let templates = sqlx::query_as::<_, WorkoutRoutine>(&format!(
            "SELECT {ROUTINE_COLUMNS} FROM workout_routines
             WHERE tenant_id = $1 AND is_template AND deleted_at IS NULL
             ORDER BY name"
        ))
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(templates)
    }

    /// Routines assigned to one student, with exercises, for the student app
    pub async fn list_for_student(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Vec<RoutineWithExercises>> {
        let routines = sqlx::query_as::<_, WorkoutRoutine>(&format!(
            "SELECT {ROUTINE_COLUMNS} FROM workout_routines
             WHERE tenant_id = $1 AND student_id = $2 AND deleted_at IS NULL
             ORDER BY updated_at DESC"
        ))
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        self.with_exercises(routines).await
    }

    pub async fn update_routine(
        &self,
        tenant_id: Uuid,
        routine_id: Uuid,
        request: &UpdateRoutineRequest,
    ) -> Result<Option<RoutineWithExercises>> {
        let mut tx = self.db.begin().await?;

        let routine = sqlx::query_as::<_, WorkoutRoutine>(&format!(
            "UPDATE workout_routines SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
             RETURNING {ROUTINE_COLUMNS}"
        ))
        .bind(routine_id)
        .bind(tenant_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.description.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(routine) = routine else {
            return Ok(None);
        };

        if let Some(exercises) = &request.exercises {
            sqlx::query("DELETE FROM workout_exercises WHERE routine_id = $1")
                .bind(routine.id)
                .execute(&mut *tx)
                .await?;
            Self::insert_exercises(&mut *tx, routine.id, exercises).await?;
        }

        tx.commit().await?;
        Ok(self.with_exercises(vec![routine]).await?.pop())
    }

    pub async fn delete_routine(&self, tenant_id: Uuid, routine_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE workout_routines SET deleted_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(routine_id)
        .bind(tenant_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deep-copy a template onto a student. The template is left untouched.
    pub async fn assign_template(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        trainer_id: Uuid,
        request: &AssignTemplateRequest,
    ) -> Result<Option<RoutineWithExercises>> {
        let Some(template) = self.get_routine(tenant_id, template_id).await? else {
            return Ok(None);
        };
        if !template.routine.is_template {
            return Err(DomainError::invalid_state("Only templates can be assigned"));
        }

        let student_user_id = self.student_account(tenant_id, request.student_id).await?;
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&template.routine.name);

        let mut tx = self.db.begin().await?;

        let routine = sqlx::query_as::<_, WorkoutRoutine>(&format!(
            "INSERT INTO workout_routines (tenant_id, trainer_id, student_id, name, description, is_template)
             VALUES ($1, $2, $3, $4, $5, FALSE)
             RETURNING {ROUTINE_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(trainer_id)
        .bind(request.student_id)
        .bind(name)
        .bind(template.routine.description.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let exercises = sqlx::query_as::<_, WorkoutExercise>(&format!(
            "INSERT INTO workout_exercises (routine_id, position, name, sets, reps, weight_kg, rest_seconds, video_url, notes)
             SELECT $1, position, name, sets, reps, weight_kg, rest_seconds, video_url, notes
             FROM workout_exercises WHERE routine_id = $2
             RETURNING {EXERCISE_COLUMNS}"
        ))
        .bind(routine.id)
        .bind(template_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut exercises = exercises;
        exercises.sort_by_key(|e| e.position);

        info!(template_id = %template_id, routine_id = %routine.id, student_id = %request.student_id, "Template assigned");
        self.notify_assigned(tenant_id, student_user_id, &routine).await;

        Ok(Some(RoutineWithExercises { routine, exercises }))
    }

    /// Record a completed workout. Replaying the same `client_log_id` returns
    /// the stored log instead of creating another.
    pub async fn log_workout(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        routine_id: Uuid,
        request: &CreateWorkoutLogRequest,
    ) -> Result<Option<WorkoutLog>> {
        let owns_routine = sqlx::query(
            "SELECT 1 FROM workout_routines
             WHERE id = $1 AND tenant_id = $2 AND student_id = $3 AND deleted_at IS NULL",
        )
        .bind(routine_id)
        .bind(tenant_id)
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;
        if owns_routine.is_none() {
            return Ok(None);
        }

        let inserted = sqlx::query_as::<_, WorkoutLog>(&format!(
            "INSERT INTO workout_logs (tenant_id, routine_id, student_id, client_log_id, completed_at, duration_minutes, perceived_effort, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (client_log_id) DO NOTHING
             RETURNING {LOG_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(routine_id)
        .bind(student_id)
        .bind(request.client_log_id)
        .bind(request.completed_at.unwrap_or_else(Utc::now))
        .bind(request.duration_minutes)
        .bind(request.perceived_effort)
        .bind(request.notes.as_deref())
        .fetch_optional(&self.db)
        .await?;

        if let Some(log) = inserted {
            info!(log_id = %log.id, %routine_id, "Workout logged");
            return Ok(Some(log));
        }

        let existing = sqlx::query_as::<_, WorkoutLog>(&format!(
            "SELECT {LOG_COLUMNS} FROM workout_logs
             WHERE client_log_id = $1 AND tenant_id = $2 AND student_id = $3"
        ))
        .bind(request.client_log_id)
        .bind(tenant_id)
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;

        match existing {
            Some(log) => Ok(Some(log)),
            None => Err(DomainError::conflict("client_log_id is already used")),
        }
    }

    pub async fn list_logs(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        routine_id: Option<Uuid>,
    ) -> Result<Vec<WorkoutLog>> {
        let logs = sqlx::query_as::<_, WorkoutLog>(&format!(
            "SELECT {LOG_COLUMNS} FROM workout_logs
             WHERE tenant_id = $1 AND student_id = $2
               AND ($3::uuid IS NULL OR routine_id = $3)
             ORDER BY completed_at DESC
             LIMIT 100"
        ))
        .bind(tenant_id)
        .bind(student_id)
        .bind(routine_id)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }
}
