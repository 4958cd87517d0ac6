use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[serde(alias = "M", alias = "m")]
    Male,
    #[serde(alias = "F", alias = "f")]
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Inactive,
    Suspended,
    Pending, // Waiting for account activation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "fitness_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub trainer_id: Option<Uuid>,
    pub user_id: Option<Uuid>, // Login account, once invited
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub goal: Option<String>,
    pub level: FitnessLevel,
    pub status: EnrollmentStatus,
    pub notes: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or(&self.full_name)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 2, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[validate(length(max = 1000))]
    pub goal: Option<String>,
    pub level: Option<FitnessLevel>,
    pub trainer_id: Option<Uuid>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 2, max = 200))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[validate(length(max = 1000))]
    pub goal: Option<String>,
    pub level: Option<FitnessLevel>,
    pub trainer_id: Option<Uuid>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentStatusRequest {
    pub status: EnrollmentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    pub status: Option<EnrollmentStatus>,
    pub trainer_id: Option<Uuid>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_accepts_short_codes() {
        let male: Gender = serde_json::from_str("\"M\"").unwrap();
        let female: Gender = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(male, Gender::Male);
        assert_eq!(female, Gender::Female);
    }

    #[test]
    fn test_create_student_validation() {
        let request = CreateStudentRequest {
            full_name: "A".to_string(),
            email: Some("not-an-email".to_string()),
            phone: None,
            birth_date: None,
            gender: None,
            goal: None,
            level: None,
            trainer_id: None,
            notes: None,
        };

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("full_name"));
        assert!(fields.contains_key("email"));
    }
}
