use anyhow::Result;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthService, NewInvitedUser, UserRole};
use crate::models::{
    actions, page_bounds, CreateTenantRequest, NewAuditEntry, Page, ProvisionedTenant, Tenant,
    TenantQuery, TenantStatus, UpdateTenantRequest, UpdateTenantStatusRequest,
};
use crate::services::{AuditService, BillingService, DomainError};

const TENANT_COLUMNS: &str = "id, name, tenant_type, plan_id, status, owner_name, owner_email, owner_phone, created_at, updated_at";

/// Tenant lifecycle, driven from the super-admin back office. Every mutation
/// is audited.
#[derive(Clone)]
pub struct TenantService {
    db: PgPool,
    auth: AuthService,
}

impl TenantService {
    pub fn new(db: PgPool, auth: AuthService) -> Self {
        Self { db, auth }
    }

    pub async fn list(&self, query: &TenantQuery) -> Result<Page<Tenant>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let filter = "($1::tenant_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR owner_email ILIKE $2)";

        let items = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE {filter}
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(query.status)
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tenants WHERE {filter}"))
            .bind(query.status)
            .bind(search.as_deref())
            .fetch_one(&self.db)
            .await?;

        Ok(Page { items, total, limit, offset })
    }

    pub async fn get(&self, tenant_id: Uuid) -> Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"))
            .bind(tenant_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(tenant)
    }

    /// Create a tenant in trial together with its trial subscription and the
    /// owner's admin account. The owner receives an invitation e-mail once
    /// everything is committed.
    pub async fn provision(&self, actor_id: Uuid, request: &CreateTenantRequest) -> Result<ProvisionedTenant> {
        let plan_active: Option<bool> = sqlx::query_scalar("SELECT active FROM plans WHERE id = $1")
            .bind(request.plan_id)
            .fetch_optional(&self.db)
            .await?;
        match plan_active {
            None => return Err(DomainError::NotFound("Plan").into()),
            Some(false) => return Err(DomainError::invalid_state("Plan is no longer offered")),
            Some(true) => {}
        }

        let mut tx = self.db.begin().await?;

        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "INSERT INTO tenants (name, tenant_type, plan_id, status, owner_name, owner_email, owner_phone)
             VALUES ($1, $2, $3, 'trial', $4, $5, $6)
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(request.name.trim())
        .bind(request.tenant_type)
        .bind(request.plan_id)
        .bind(request.owner_name.trim())
        .bind(request.owner_email.trim().to_lowercase())
        .bind(request.owner_phone.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        BillingService::create_trial_subscription(&mut *tx, tenant.id, request.plan_id).await?;

        let invitation = self
            .auth
            .create_invited_user(
                &mut *tx,
                NewInvitedUser {
                    tenant_id: tenant.id,
                    email: &tenant.owner_email,
                    full_name: &tenant.owner_name,
                    role: UserRole::Admin,
                },
            )
            .await?;

        AuditService::record_with(
            &mut *tx,
            NewAuditEntry::new(actions::TENANT_CREATED, "tenant")
                .actor(actor_id)
                .tenant(tenant.id)
                .target(tenant.id)
                .details(json!({
                    "name": tenant.name,
                    "tenant_type": tenant.tenant_type,
                    "plan_id": request.plan_id,
                    "owner_user_id": invitation.user.id,
                })),
        )
        .await?;

        tx.commit().await?;

        self.auth.send_invitation(&invitation, &tenant.name).await;

        info!(tenant_id = %tenant.id, name = %tenant.name, "Tenant provisioned");
        Ok(ProvisionedTenant {
            owner_user_id: invitation.user.id,
            tenant,
        })
    }

    pub async fn update(
        &self,
        actor_id: Uuid,
        tenant_id: Uuid,
        request: &UpdateTenantRequest,
    ) -> Result<Option<Tenant>> {
        let mut tx = self.db.begin().await?;

        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE tenants SET
                name = COALESCE($2, name),
                owner_name = COALESCE($3, owner_name),
                owner_email = COALESCE($4, owner_email),
                owner_phone = COALESCE($5, owner_phone),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(request.name.as_deref())
        .bind(request.owner_name.as_deref())
        .bind(request.owner_email.as_deref().map(str::to_lowercase))
        .bind(request.owner_phone.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(tenant) = tenant else {
            return Ok(None);
        };

        AuditService::record_with(
            &mut *tx,
            NewAuditEntry::new(actions::TENANT_UPDATED, "tenant")
                .actor(actor_id)
                .tenant(tenant.id)
                .target(tenant.id),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(tenant))
    }

    /// Suspend, reactivate or cancel. Canceling also cancels the subscription.
    pub async fn change_status(
        &self,
        actor_id: Uuid,
        tenant_id: Uuid,
        request: &UpdateTenantStatusRequest,
    ) -> Result<Option<Tenant>> {
        let Some(current) = self.get(tenant_id).await? else {
            return Ok(None);
        };

        if current.status == request.status {
            return Ok(Some(current));
        }
        if current.status == TenantStatus::Canceled {
            return Err(DomainError::invalid_state("A canceled tenant cannot change status"));
        }

        let mut tx = self.db.begin().await?;

        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE tenants SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {TENANT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(request.status)
        .fetch_one(&mut *tx)
        .await?;

        if request.status == TenantStatus::Canceled {
            BillingService::cancel_subscription(&mut *tx, tenant_id).await?;
        }

        AuditService::record_with(
            &mut *tx,
            NewAuditEntry::new(actions::TENANT_STATUS_CHANGED, "tenant")
                .actor(actor_id)
                .tenant(tenant_id)
                .target(tenant_id)
                .details(json!({
                    "from": current.status,
                    "to": request.status,
                    "reason": request.reason,
                })),
        )
        .await?;

        tx.commit().await?;

        info!(%tenant_id, from = ?current.status, to = ?request.status, "Tenant status changed");
        Ok(Some(tenant))
    }
}
