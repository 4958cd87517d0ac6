use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthService, NewInvitedUser, UserRole};
use crate::models::{
    page_bounds, CreateStudentRequest, EnrollmentStatus, FitnessLevel, Page, Student, StudentQuery,
    UpdateStudentRequest,
};
use crate::services::DomainError;

pub(crate) const STUDENT_COLUMNS: &str = "id, tenant_id, trainer_id, user_id, full_name, email, phone, birth_date, gender, goal, level, status, notes, deleted_at, created_at, updated_at";

#[derive(Clone)]
pub struct StudentService {
    db: PgPool,
    auth: AuthService,
}

impl StudentService {
    pub fn new(db: PgPool, auth: AuthService) -> Self {
        Self { db, auth }
    }

    pub async fn list(&self, tenant_id: Uuid, query: &StudentQuery) -> Result<Page<Student>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let filter = "tenant_id = $1
              AND ($2 OR deleted_at IS NULL)
              AND ($3::enrollment_status IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR trainer_id = $4)
              AND ($5::text IS NULL OR full_name ILIKE $5 OR email ILIKE $5)";

        let items = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE {filter}
             ORDER BY full_name LIMIT $6 OFFSET $7"
        ))
        .bind(tenant_id)
        .bind(query.include_deleted)
        .bind(query.status)
        .bind(query.trainer_id)
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM students WHERE {filter}"))
            .bind(tenant_id)
            .bind(query.include_deleted)
            .bind(query.status)
            .bind(query.trainer_id)
            .bind(search.as_deref())
            .fetch_one(&self.db)
            .await?;

        Ok(Page { items, total, limit, offset })
    }

    /// A live (not deleted) student of the tenant
    pub async fn get(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Option<Student>> {
        Ok(self
            .get_including_deleted(tenant_id, student_id)
            .await?
            .filter(|student| !student.is_deleted()))
    }

    pub async fn get_including_deleted(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(student_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    /// Student record linked to a login account
    pub async fn find_by_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students
             WHERE user_id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    async fn ensure_trainer(&self, tenant_id: Uuid, trainer_id: Uuid) -> Result<()> {
        let is_staff: Option<bool> = sqlx::query_scalar(
            "SELECT active AND role IN ('admin', 'trainer') FROM users WHERE id = $1 AND tenant_id = $2",
        )
        .bind(trainer_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        match is_staff {
            Some(true) => Ok(()),
            _ => Err(DomainError::invalid_input("Trainer must be an active member of the team")),
        }
    }

    /// Trainers own the students they create unless another trainer is named.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        caller_id: Uuid,
        caller_role: UserRole,
        request: &CreateStudentRequest,
    ) -> Result<Student> {
        let trainer_id = match (request.trainer_id, caller_role) {
            (Some(trainer_id), _) => Some(trainer_id),
            (None, UserRole::Trainer) => Some(caller_id),
            (None, _) => None,
        };
        if let Some(trainer_id) = trainer_id {
            self.ensure_trainer(tenant_id, trainer_id).await?;
        }

        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (tenant_id, trainer_id, full_name, email, phone, birth_date, gender, goal, level, status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', $10)
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(trainer_id)
        .bind(request.full_name.trim())
        .bind(request.email.as_deref().map(str::to_lowercase))
        .bind(request.phone.as_deref())
        .bind(request.birth_date)
        .bind(request.gender)
        .bind(request.goal.as_deref())
        .bind(request.level.unwrap_or(FitnessLevel::Beginner))
        .bind(request.notes.as_deref())
        .fetch_one(&self.db)
        .await?;

        info!(student_id = %student.id, %tenant_id, "Student created");
        Ok(student)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        request: &UpdateStudentRequest,
    ) -> Result<Option<Student>> {
        if let Some(trainer_id) = request.trainer_id {
            self.ensure_trainer(tenant_id, trainer_id).await?;
        }

        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET
                full_name = COALESCE($3, full_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                birth_date = COALESCE($6, birth_date),
                gender = COALESCE($7, gender),
                goal = COALESCE($8, goal),
                level = COALESCE($9, level),
                trainer_id = COALESCE($10, trainer_id),
                notes = COALESCE($11, notes),
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(student_id)
        .bind(tenant_id)
        .bind(request.full_name.as_deref().map(str::trim))
        .bind(request.email.as_deref().map(str::to_lowercase))
        .bind(request.phone.as_deref())
        .bind(request.birth_date)
        .bind(request.gender)
        .bind(request.goal.as_deref())
        .bind(request.level)
        .bind(request.trainer_id)
        .bind(request.notes.as_deref())
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        status: EnrollmentStatus,
    ) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET status = $3, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(student_id)
        .bind(tenant_id)
        .bind(status)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    /// Soft delete; history (assessments, logs) is kept
    pub async fn soft_delete(&self, tenant_id: Uuid, student_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE students SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(student_id)
        .bind(tenant_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn restore(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET deleted_at = NULL, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NOT NULL
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(student_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    /// Give the student a login account and mail the invitation
    pub async fn invite(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Option<Student>> {
        let Some(student) = self.get(tenant_id, student_id).await? else {
            return Ok(None);
        };

        if student.user_id.is_some() {
            return Err(DomainError::conflict("Student already has an account"));
        }
        let Some(email) = student.email.as_deref() else {
            return Err(DomainError::invalid_input("Student needs an e-mail address to be invited"));
        };

        let tenant_name: String = sqlx::query_scalar("SELECT name FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_one(&self.db)
            .await?;

        let mut tx = self.db.begin().await?;

        let invitation = self
            .auth
            .create_invited_user(
                &mut *tx,
                NewInvitedUser {
                    tenant_id,
                    email,
                    full_name: &student.full_name,
                    role: UserRole::Student,
                },
            )
            .await?;

        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET user_id = $3, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(student_id)
        .bind(tenant_id)
        .bind(invitation.user.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.auth.send_invitation(&invitation, &tenant_name).await;
        Ok(Some(student))
    }
}
