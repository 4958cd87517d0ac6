use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::UserRole;
use crate::models::{Conversation, CreateNotification, Message, MessagesQuery, NotificationType};
use crate::services::{DomainError, NotificationService};

const CONVERSATION_COLUMNS: &str = "id, tenant_id, trainer_user_id, student_user_id, last_message, last_message_at, trainer_unread, student_unread, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, read_at, created_at";

const DEFAULT_MESSAGE_LIMIT: i64 = 50;
const MAX_MESSAGE_LIMIT: i64 = 200;
const PREVIEW_CHARS: usize = 120;

/// Trainer/student chat threads. Clients poll for new messages.
#[derive(Clone)]
pub struct MessageService {
    db: PgPool,
    notifications: NotificationService,
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

impl MessageService {
    pub fn new(db: PgPool) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self { db, notifications }
    }

    /// Open or reuse the thread between the caller and another tenant user.
    /// One side must be staff and the other a student.
    pub async fn start_conversation(
        &self,
        tenant_id: Uuid,
        caller_id: Uuid,
        caller_role: UserRole,
        participant_id: Uuid,
    ) -> Result<Conversation> {
        let participant_role: Option<UserRole> = sqlx::query_scalar(
            "SELECT role FROM users WHERE id = $1 AND tenant_id = $2 AND active",
        )
        .bind(participant_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        let participant_role = participant_role.ok_or(DomainError::NotFound("User"))?;

        let (trainer_user_id, student_user_id) = match (caller_role, participant_role) {
            (caller, UserRole::Student) if caller.is_staff() => (caller_id, participant_id),
            (UserRole::Student, other) if other.is_staff() => (participant_id, caller_id),
            _ => {
                return Err(DomainError::invalid_input(
                    "Conversations are between a trainer and a student",
                ))
            }
        };

        self.ensure_conversation(tenant_id, trainer_user_id, student_user_id).await
    }

    /// Get-or-create for a trainer/student pair
    pub async fn ensure_conversation(
        &self,
        tenant_id: Uuid,
        trainer_user_id: Uuid,
        student_user_id: Uuid,
    ) -> Result<Conversation> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "INSERT INTO conversations (tenant_id, trainer_user_id, student_user_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (tenant_id, trainer_user_id, student_user_id)
             DO UPDATE SET tenant_id = EXCLUDED.tenant_id
             RETURNING {CONVERSATION_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(trainer_user_id)
        .bind(student_user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(conversation)
    }

    pub async fn list_conversations(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE tenant_id = $1 AND (trainer_user_id = $2 OR student_user_id = $2)
             ORDER BY last_message_at DESC NULLS LAST, created_at DESC"
        ))
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(conversations)
    }

    /// The conversation, only when `user_id` takes part in it
    pub async fn get_conversation_for(
        &self,
        tenant_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(conversation_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(conversation.filter(|c| c.has_participant(user_id)))
    }

    /// Messages in chronological order. Without `after` the latest page is
    /// returned; with `after` only strictly newer messages.
    pub async fn list_messages(
        &self,
        tenant_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
        query: &MessagesQuery,
    ) -> Result<Option<Vec<Message>>> {
        if self.get_conversation_for(tenant_id, conversation_id, user_id).await?.is_none() {
            return Ok(None);
        }

        let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, MAX_MESSAGE_LIMIT);

        let messages = match query.after {
            Some(after) => {
                sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = $1 AND created_at > $2
                     ORDER BY created_at, id
                     LIMIT $3"
                ))
                .bind(conversation_id)
                .bind(after)
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                let mut latest = sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = $1
                     ORDER BY created_at DESC, id DESC
                     LIMIT $2"
                ))
                .bind(conversation_id)
                .bind(limit)
                .fetch_all(&self.db)
                .await?;
                latest.reverse();
                latest
            }
        };

        Ok(Some(messages))
    }

    pub async fn send_message(
        &self,
        tenant_id: Uuid,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: &str,
    ) -> Result<Option<Message>> {
        let Some(conversation) = self.get_conversation_for(tenant_id, conversation_id, sender_id).await? else {
            return Ok(None);
        };

        self.post(&conversation, sender_id, body).await.map(Some)
    }

    /// Append a message, refresh the inbox preview, bump the recipient's
    /// unread counter and notify them.
    pub(crate) async fn post(&self, conversation: &Conversation, sender_id: Uuid, body: &str) -> Result<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DomainError::invalid_input("Message cannot be empty"));
        }
        let sender_is_trainer = sender_id == conversation.trainer_user_id;

        let mut tx = self.db.begin().await?;

        let message = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages (conversation_id, sender_id, body)
             VALUES ($1, $2, $3)
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(conversation.id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE conversations SET
                last_message = $2,
                last_message_at = $3,
                student_unread = student_unread + CASE WHEN $4 THEN 1 ELSE 0 END,
                trainer_unread = trainer_unread + CASE WHEN $4 THEN 0 ELSE 1 END
             WHERE id = $1",
        )
        .bind(conversation.id)
        .bind(preview(body))
        .bind(message.created_at)
        .bind(sender_is_trainer)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let recipient = conversation.other_participant(sender_id);
        self.notifications
            .notify(
                CreateNotification::new(
                    Some(conversation.tenant_id),
                    recipient,
                    NotificationType::Message,
                    "New message",
                    preview(body),
                )
                .with_link(format!("/messages/{}", conversation.id)),
            )
            .await;

        info!(conversation_id = %conversation.id, message_id = %message.id, "Message sent");
        Ok(message)
    }

    /// Mark everything the other side sent as read and reset the caller's counter.
    pub async fn mark_read(&self, tenant_id: Uuid, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Conversation>> {
        let Some(conversation) = self.get_conversation_for(tenant_id, conversation_id, user_id).await? else {
            return Ok(None);
        };
        let reader_is_trainer = user_id == conversation.trainer_user_id;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE messages SET read_at = NOW()
             WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL",
        )
        .bind(conversation.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, Conversation>(&format!(
            "UPDATE conversations SET
                trainer_unread = CASE WHEN $2 THEN 0 ELSE trainer_unread END,
                student_unread = CASE WHEN $2 THEN student_unread ELSE 0 END
             WHERE id = $1
             RETURNING {CONVERSATION_COLUMNS}"
        ))
        .bind(conversation.id)
        .bind(reader_is_trainer)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Sum of unread counters across the user's conversations
    pub async fn unread_total(&self, tenant_id: Uuid, user_id: Uuid) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(CASE WHEN trainer_user_id = $2 THEN trainer_unread ELSE student_unread END), 0)::BIGINT
             FROM conversations
             WHERE tenant_id = $1 AND (trainer_user_id = $2 OR student_user_id = $2)",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let body = "ação ".repeat(60);
        let short = preview(&body);
        assert_eq!(short.chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("Oi!"), "Oi!");
    }
}
