use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::Gender;
use crate::services::body_composition::{Classification, Measurements};

/// Physical assessment. `bmi`, `body_fat_percent` and `waist_hip_ratio` are
/// derived from the raw measurements when the record is saved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub assessed_by: Option<Uuid>,
    pub assessed_on: NaiveDate,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    pub neck_cm: Option<f64>,
    pub chest_cm: Option<f64>,
    pub arm_cm: Option<f64>,
    pub thigh_cm: Option<f64>,
    pub calf_cm: Option<f64>,
    pub bmi: f64,
    pub body_fat_percent: Option<f64>,
    pub waist_hip_ratio: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    pub assessed_on: Option<NaiveDate>,
    #[validate(range(min = 1.0, max = 500.0))]
    pub weight_kg: f64,
    #[validate(range(min = 50.0, max = 260.0))]
    pub height_cm: f64,
    #[validate(range(min = 20.0, max = 300.0))]
    pub waist_cm: Option<f64>,
    #[validate(range(min = 20.0, max = 300.0))]
    pub hip_cm: Option<f64>,
    #[validate(range(min = 10.0, max = 100.0))]
    pub neck_cm: Option<f64>,
    #[validate(range(min = 20.0, max = 300.0))]
    pub chest_cm: Option<f64>,
    #[validate(range(min = 5.0, max = 100.0))]
    pub arm_cm: Option<f64>,
    #[validate(range(min = 10.0, max = 150.0))]
    pub thigh_cm: Option<f64>,
    #[validate(range(min = 10.0, max = 100.0))]
    pub calf_cm: Option<f64>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

impl CreateAssessmentRequest {
    pub fn measurements(&self) -> Measurements {
        Measurements {
            weight_kg: self.weight_kg,
            height_cm: self.height_cm,
            waist_cm: self.waist_cm,
            hip_cm: self.hip_cm,
            neck_cm: self.neck_cm,
        }
    }
}

/// Compute metrics without persisting anything (form preview)
#[derive(Debug, Deserialize, Validate)]
pub struct AssessmentPreviewRequest {
    pub gender: Gender,
    #[validate(range(min = 0.0, max = 500.0))]
    pub weight_kg: f64,
    #[validate(range(min = 0.0, max = 260.0))]
    pub height_cm: f64,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    pub neck_cm: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IdealWeightRequest {
    #[validate(range(min = 0.0, max = 260.0))]
    pub height_cm: f64,
    pub gender: Gender,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentClassifications {
    pub bmi: Option<Classification>,
    pub body_fat: Option<Classification>,
    pub waist_hip_ratio: Option<Classification>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub assessment: Assessment,
    pub classifications: AssessmentClassifications,
    pub warnings: Vec<String>,
}

/// Assessment history for charts, oldest first.
#[derive(Debug, Serialize)]
pub struct AssessmentHistory {
    pub student_id: Uuid,
    pub assessments: Vec<Assessment>,
    pub weight_change_kg: Option<f64>,
    pub body_fat_change: Option<f64>,
}

impl AssessmentHistory {
    pub fn new(student_id: Uuid, assessments: Vec<Assessment>) -> Self {
        let (weight_change_kg, body_fat_change) = match (assessments.first(), assessments.last()) {
            (Some(first), Some(last)) if assessments.len() > 1 => (
                Some(round_delta(last.weight_kg - first.weight_kg)),
                match (first.body_fat_percent, last.body_fat_percent) {
                    (Some(a), Some(b)) => Some(round_delta(b - a)),
                    _ => None,
                },
            ),
            _ => (None, None),
        };

        Self {
            student_id,
            assessments,
            weight_change_kg,
            body_fat_change,
        }
    }
}

fn round_delta(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
