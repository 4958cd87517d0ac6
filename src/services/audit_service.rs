use anyhow::Result;
use sqlx::{Executor, PgPool, Postgres};

use crate::models::{page_bounds, AuditLog, AuditLogQuery, NewAuditEntry, Page};

const AUDIT_COLUMNS: &str = "id, actor_id, tenant_id, action, target_type, target_id, details, created_at";

/// Append-only audit trail of administrative actions
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Write an entry with any executor, so it can join the caller's transaction
    pub async fn record_with<'e, E>(executor: E, entry: NewAuditEntry) -> Result<AuditLog>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let log = sqlx::query_as::<_, AuditLog>(&format!(
            "INSERT INTO audit_logs (actor_id, tenant_id, action, target_type, target_id, details)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {AUDIT_COLUMNS}"
        ))
        .bind(entry.actor_id)
        .bind(entry.tenant_id)
        .bind(entry.action)
        .bind(entry.target_type)
        .bind(entry.target_id)
        .bind(entry.details)
        .fetch_one(executor)
        .await?;

        tracing::info!(action = %log.action, target = %log.target_type, "Audit entry recorded");
        Ok(log)
    }

    pub async fn record(&self, entry: NewAuditEntry) -> Result<AuditLog> {
        Self::record_with(&self.db, entry).await
    }

    pub async fn list(&self, query: &AuditLogQuery) -> Result<Page<AuditLog>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);
        let filter = "($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::uuid IS NULL OR actor_id = $2)
              AND ($3::text IS NULL OR action = $3)";

        let items = sqlx::query_as::<_, AuditLog>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs
             WHERE {filter}
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(query.tenant_id)
        .bind(query.actor_id)
        .bind(query.action.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_logs WHERE {filter}"))
            .bind(query.tenant_id)
            .bind(query.actor_id)
            .bind(query.action.as_deref())
            .fetch_one(&self.db)
            .await?;

        Ok(Page { items, total, limit, offset })
    }
}
