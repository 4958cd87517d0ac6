use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "auto_message_trigger", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AutoMessageTrigger {
    Welcome,
    Birthday,
    Inactivity,
    AssessmentDue,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AutoMessageTemplate {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(rename = "trigger")]
    pub trigger_event: AutoMessageTrigger,
    pub body: String, // May contain {{student_name}} style placeholders
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAutoMessageRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub trigger: AutoMessageTrigger,
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAutoMessageRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub trigger: Option<AutoMessageTrigger>,
    #[validate(length(min = 1, max = 4000))]
    pub body: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SendAutoMessageRequest {
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Serialize)]
pub struct SendAutoMessageResult {
    pub sent: usize,
    /// Students without a login account or otherwise unreachable
    pub skipped: Vec<Uuid>,
}
