use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One-to-one thread between a trainer account and a student account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub trainer_user_id: Uuid,
    pub student_user_id: Uuid,
    pub last_message: Option<String>, // Preview cache for the inbox list
    pub last_message_at: Option<DateTime<Utc>>,
    pub trainer_unread: i32,
    pub student_unread: i32,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.trainer_user_id == user_id || self.student_user_id == user_id
    }

    pub fn unread_for(&self, user_id: Uuid) -> i32 {
        if user_id == self.trainer_user_id {
            self.trainer_unread
        } else if user_id == self.student_user_id {
            self.student_unread
        } else {
            0
        }
    }

    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if user_id == self.trainer_user_id {
            self.student_user_id
        } else {
            self.trainer_user_id
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Opens (or returns the existing) conversation with another user of the tenant.
#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    pub participant_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
}

/// Polling query: `after` returns only messages newer than the given instant.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}
