use anyhow::Result;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::models::{page_bounds, CreateNotification, Notification, NotificationQuery};

const NOTIFICATION_COLUMNS: &str =
    "id, tenant_id, user_id, notification_type, title, body, link, read_at, created_at";

/// In-app notifications, always addressed to a single user
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, notification: CreateNotification) -> Result<Notification> {
        let created = sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (tenant_id, user_id, notification_type, title, body, link)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification.tenant_id)
        .bind(notification.user_id)
        .bind(notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .fetch_one(&self.db)
        .await?;

        Ok(created)
    }

    /// Side-effect notification: a failure is logged and otherwise ignored.
    pub async fn notify(&self, notification: CreateNotification) {
        let user_id = notification.user_id;
        let kind = notification.notification_type;
        if let Err(e) = self.create(notification).await {
            warn!(%user_id, ?kind, error = %e, "Failed to create notification");
        }
    }

    pub async fn list(&self, user_id: Uuid, query: &NotificationQuery) -> Result<Vec<Notification>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(query.unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    /// Returns `None` when the notification does not belong to the user
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND user_id = $2
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(notification)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
