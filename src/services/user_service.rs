use anyhow::Result;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{AuthService, NewInvitedUser};
use crate::models::{actions, InviteUserRequest, NewAuditEntry, User, UserResponse};
use crate::services::{AuditService, DomainError};

const USER_COLUMNS: &str =
    "id, tenant_id, email, password_hash, full_name, role, active, created_at, updated_at";

/// Tenant team management (admins and trainers)
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
    auth: AuthService,
    audit: AuditService,
}

impl UserService {
    pub fn new(db: PgPool, auth: AuthService) -> Self {
        let audit = AuditService::new(db.clone());
        Self { db, auth, audit }
    }

    pub async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// An active admin or trainer of the tenant
    pub async fn get_staff_member(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<User>> {
        Ok(self
            .get_user(tenant_id, user_id)
            .await?
            .filter(|user| user.active && user.role.is_staff()))
    }

    pub async fn list_team(&self, tenant_id: Uuid) -> Result<Vec<UserResponse>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE tenant_id = $1 AND role IN ('admin', 'trainer')
             ORDER BY role, full_name"
        ))
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Invite an admin or trainer. Students get accounts through their
    /// student record instead.
    pub async fn invite_team_member(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        request: &InviteUserRequest,
    ) -> Result<UserResponse> {
        if !request.role.is_invitable_team_role() {
            return Err(DomainError::invalid_input("Only admins and trainers can be invited to the team"));
        }

        let tenant_name: String = sqlx::query_scalar("SELECT name FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(DomainError::NotFound("Tenant"))?;

        let user = self
            .auth
            .invite_user(
                NewInvitedUser {
                    tenant_id,
                    email: &request.email,
                    full_name: &request.full_name,
                    role: request.role,
                },
                &tenant_name,
            )
            .await?;

        self.audit
            .record(
                NewAuditEntry::new(actions::USER_INVITED, "user")
                    .actor(actor_id)
                    .tenant(tenant_id)
                    .target(user.id)
                    .details(json!({ "email": user.email, "role": request.role })),
            )
            .await?;

        Ok(UserResponse::from(user))
    }

    pub async fn full_name(&self, user_id: Uuid) -> Result<Option<String>> {
        let name = sqlx::query_scalar("SELECT full_name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(name)
    }
}
