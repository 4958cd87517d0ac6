use anyhow::Result;
use chrono::{Datelike, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Assessment, AssessmentClassifications, AssessmentHistory, AssessmentResponse, CreateAssessmentRequest,
    CreateNotification, Gender, NotificationType,
};
use crate::services::body_composition::{AssessmentMetrics, Measurements};
use crate::services::NotificationService;

const ASSESSMENT_COLUMNS: &str = "id, tenant_id, student_id, assessed_by, assessed_on, weight_kg, height_cm, waist_cm, hip_cm, neck_cm, chest_cm, arm_cm, thigh_cm, calf_cm, bmi, body_fat_percent, waist_hip_ratio, notes, created_at";

/// Physical assessments. Derived metrics are computed here and stored with
/// the raw measurements.
#[derive(Clone)]
pub struct AssessmentService {
    db: PgPool,
    notifications: NotificationService,
}

fn describe(metrics: AssessmentMetrics) -> (AssessmentClassifications, Vec<String>) {
    (
        AssessmentClassifications {
            bmi: metrics.bmi_class,
            body_fat: metrics.body_fat_class,
            waist_hip_ratio: metrics.waist_hip_class,
        },
        metrics.warnings,
    )
}

fn stored_measurements(assessment: &Assessment) -> Measurements {
    Measurements {
        weight_kg: assessment.weight_kg,
        height_cm: assessment.height_cm,
        waist_cm: assessment.waist_cm,
        hip_cm: assessment.hip_cm,
        neck_cm: assessment.neck_cm,
    }
}

impl AssessmentService {
    pub fn new(db: PgPool) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self { db, notifications }
    }

    /// Gender and login account of a live student, `None` when the student is
    /// not visible to the tenant.
    async fn student_profile(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Option<(Option<Gender>, Option<Uuid>)>> {
        let row = sqlx::query_as::<_, (Option<Gender>, Option<Uuid>)>(
            "SELECT gender, user_id FROM students
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(student_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        assessed_by: Uuid,
        request: &CreateAssessmentRequest,
    ) -> Result<Option<AssessmentResponse>> {
        let Some((gender, student_user_id)) = self.student_profile(tenant_id, student_id).await? else {
            return Ok(None);
        };

        let metrics = AssessmentMetrics::compute(gender, &request.measurements());

        let assessment = sqlx::query_as::<_, Assessment>(&format!(
            "INSERT INTO assessments (
                tenant_id, student_id, assessed_by, assessed_on, weight_kg, height_cm,
                waist_cm, hip_cm, neck_cm, chest_cm, arm_cm, thigh_cm, calf_cm,
                bmi, body_fat_percent, waist_hip_ratio, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
             RETURNING {ASSESSMENT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(student_id)
        .bind(assessed_by)
        .bind(request.assessed_on.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(request.weight_kg)
        .bind(request.height_cm)
        .bind(request.waist_cm)
        .bind(request.hip_cm)
        .bind(request.neck_cm)
        .bind(request.chest_cm)
        .bind(request.arm_cm)
        .bind(request.thigh_cm)
        .bind(request.calf_cm)
        .bind(metrics.bmi)
        .bind(metrics.body_fat_percent)
        .bind(metrics.waist_hip_ratio)
        .bind(request.notes.as_deref())
        .fetch_one(&self.db)
        .await?;

        info!(assessment_id = %assessment.id, %student_id, bmi = assessment.bmi, "Assessment recorded");

        if let Some(user_id) = student_user_id {
            self.notifications
                .notify(
                    CreateNotification::new(
                        Some(tenant_id),
                        user_id,
                        NotificationType::AssessmentRecorded,
                        "New assessment",
                        format!("Assessment from {} is available", assessment.assessed_on.format("%d/%m/%Y")),
                    )
                    .with_link("/me/assessments"),
                )
                .await;
        }

        let (classifications, warnings) = describe(metrics);
        Ok(Some(AssessmentResponse {
            assessment,
            classifications,
            warnings,
        }))
    }

    /// Chronological history; `None` when the student is not found.
    pub async fn list_for_student(&self, tenant_id: Uuid, student_id: Uuid) -> Result<Option<AssessmentHistory>> {
        if self.student_profile(tenant_id, student_id).await?.is_none() {
            return Ok(None);
        }

        let assessments = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments
             WHERE tenant_id = $1 AND student_id = $2
             ORDER BY assessed_on, created_at"
        ))
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(AssessmentHistory::new(student_id, assessments)))
    }

    pub async fn get(&self, tenant_id: Uuid, assessment_id: Uuid) -> Result<Option<AssessmentResponse>> {
        let assessment = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(assessment_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(assessment) = assessment else {
            return Ok(None);
        };

        let gender: Option<Gender> = sqlx::query_scalar("SELECT gender FROM students WHERE id = $1")
            .bind(assessment.student_id)
            .fetch_optional(&self.db)
            .await?
            .flatten();

        let (classifications, warnings) = describe(AssessmentMetrics::compute(gender, &stored_measurements(&assessment)));
        Ok(Some(AssessmentResponse {
            assessment,
            classifications,
            warnings,
        }))
    }

    pub async fn delete(&self, tenant_id: Uuid, assessment_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assessments WHERE id = $1 AND tenant_id = $2")
            .bind(assessment_id)
            .bind(tenant_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_this_month(&self, tenant_id: Uuid) -> Result<i64> {
        let today = Utc::now().date_naive();
        let month_start = today.with_day(1).unwrap_or(today);

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assessments WHERE tenant_id = $1 AND assessed_on >= $2",
        )
        .bind(tenant_id)
        .bind(month_start)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    pub async fn recent(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Assessment>> {
        let assessments = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments
             WHERE tenant_id = $1
             ORDER BY assessed_on DESC, created_at DESC
             LIMIT $2"
        ))
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(assessments)
    }
}
