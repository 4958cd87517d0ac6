use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    AutoMessageTemplate, CreateAutoMessageRequest, SendAutoMessageResult, Student, UpdateAutoMessageRequest,
};
use crate::services::message_template::{render_template, student_variables};
use crate::services::student_service::STUDENT_COLUMNS;
use crate::services::{DomainError, MessageService};

const TEMPLATE_COLUMNS: &str = "id, tenant_id, name, trigger_event, body, active, created_at, updated_at";

/// Tenant-defined message templates, rendered per student and delivered
/// into the student's conversation with the sender.
#[derive(Clone)]
pub struct AutoMessageService {
    db: PgPool,
    messages: MessageService,
}

impl AutoMessageService {
    pub fn new(db: PgPool) -> Self {
        let messages = MessageService::new(db.clone());
        Self { db, messages }
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<AutoMessageTemplate>> {
        let templates = sqlx::query_as::<_, AutoMessageTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM auto_message_templates WHERE tenant_id = $1 ORDER BY name"
        ))
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(templates)
    }

    pub async fn get(&self, tenant_id: Uuid, template_id: Uuid) -> Result<Option<AutoMessageTemplate>> {
        let template = sqlx::query_as::<_, AutoMessageTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM auto_message_templates WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(template_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(template)
    }

    pub async fn create(&self, tenant_id: Uuid, request: &CreateAutoMessageRequest) -> Result<AutoMessageTemplate> {
        let template = sqlx::query_as::<_, AutoMessageTemplate>(&format!(
            "INSERT INTO auto_message_templates (tenant_id, name, trigger_event, body, active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(request.name.trim())
        .bind(request.trigger)
        .bind(&request.body)
        .bind(request.active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        Ok(template)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        request: &UpdateAutoMessageRequest,
    ) -> Result<Option<AutoMessageTemplate>> {
        let template = sqlx::query_as::<_, AutoMessageTemplate>(&format!(
            "UPDATE auto_message_templates SET
                name = COALESCE($3, name),
                trigger_event = COALESCE($4, trigger_event),
                body = COALESCE($5, body),
                active = COALESCE($6, active),
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(template_id)
        .bind(tenant_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.trigger)
        .bind(request.body.as_deref())
        .bind(request.active)
        .fetch_optional(&self.db)
        .await?;

        Ok(template)
    }

    pub async fn delete(&self, tenant_id: Uuid, template_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auto_message_templates WHERE id = $1 AND tenant_id = $2")
            .bind(template_id)
            .bind(tenant_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Render the template for each student and send it from `sender_id`.
    /// Students without a login account are reported as skipped.
    pub async fn send(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        sender_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<Option<SendAutoMessageResult>> {
        let Some(template) = self.get(tenant_id, template_id).await? else {
            return Ok(None);
        };
        if !template.active {
            return Err(DomainError::invalid_state("Template is inactive"));
        }

        let academy_name: String = sqlx::query_scalar("SELECT name FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_one(&self.db)
            .await?;
        let sender_name: Option<String> = sqlx::query_scalar("SELECT full_name FROM users WHERE id = $1")
            .bind(sender_id)
            .fetch_optional(&self.db)
            .await?;

        let students = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students
             WHERE tenant_id = $1 AND id = ANY($2) AND deleted_at IS NULL"
        ))
        .bind(tenant_id)
        .bind(student_ids)
        .fetch_all(&self.db)
        .await?;

        let today = Utc::now().date_naive();
        let mut result = SendAutoMessageResult::default();

        for &student_id in student_ids {
            let Some(student) = students.iter().find(|s| s.id == student_id) else {
                result.skipped.push(student_id);
                continue;
            };
            let Some(student_user_id) = student.user_id else {
                result.skipped.push(student_id);
                continue;
            };

            let vars = student_variables(student, sender_name.as_deref(), &academy_name, today);
            let body = render_template(&template.body, &vars);

            let conversation = self
                .messages
                .ensure_conversation(tenant_id, sender_id, student_user_id)
                .await?;

            match self.messages.post(&conversation, sender_id, &body).await {
                Ok(_) => result.sent += 1,
                Err(e) => {
                    warn!(%student_id, error = %e, "Auto-message not delivered");
                    result.skipped.push(student_id);
                }
            }
        }

        info!(%template_id, sent = result.sent, skipped = result.skipped.len(), "Auto-message sent");
        Ok(Some(result))
    }
}
