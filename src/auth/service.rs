use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{
    generate_reset_token, generate_temporary_password, hash_password, hash_token, verify_password,
};
use crate::auth::{
    AuthError, AuthResponse, ChangePasswordRequest, JwtService, LoginRequest, MessageResponse,
    RefreshTokenRequest, ResetPasswordRequest, TokenResponse, TokenSubject, TokenType, UserRole,
    UserSession,
};
use crate::models::{TenantStatus, User, UserResponse};
use crate::services::mailer::{invitation_email, password_reset_email, Mailer};

pub const RESET_TOKEN_TTL_HOURS: i64 = 2;
pub const INVITATION_TTL_HOURS: i64 = 72;

const USER_COLUMNS: &str =
    "id, tenant_id, email, password_hash, full_name, role, active, created_at, updated_at";

/// Account to create through an invitation
#[derive(Debug, Clone)]
pub struct NewInvitedUser<'a> {
    pub tenant_id: Uuid,
    pub email: &'a str,
    pub full_name: &'a str,
    pub role: UserRole,
}

/// Invited user plus the raw token for the "choose your password" link
#[derive(Debug)]
pub struct PendingInvitation {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    db: PgPool,
    mailer: Arc<dyn Mailer>,
    app_base_url: String,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("jwt_service", &self.jwt_service)
            .field("app_base_url", &self.app_base_url)
            .finish()
    }
}

impl AuthService {
    pub fn new(db: PgPool, jwt_secret: &str, mailer: Arc<dyn Mailer>, app_base_url: &str) -> Self {
        Self {
            jwt_service: JwtService::new(jwt_secret),
            db,
            mailer,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Login user. Users of suspended or canceled tenants are refused.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        self.ensure_can_sign_in(&user).await?;

        let (access_token, refresh_token) = self.jwt_service.create_token_pair(subject_of(&user))?;
        self.store_refresh_token(user.id, &refresh_token).await?;

        info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
            user: UserResponse::from(user),
        })
    }

    /// Exchange a stored refresh token for a new token pair. The presented
    /// refresh token is consumed, so replaying it fails. Role and tenant are
    /// re-read so changes since login take effect.
    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> Result<TokenResponse, AuthError> {
        let claims = self.jwt_service.validate_token(&request.refresh_token)?;
        if claims.typ != TokenType::Refresh {
            return Err(AuthError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        if !self.consume_refresh_token(user_id, &request.refresh_token).await? {
            warn!(user_id = %user_id, "Rejected unknown or already used refresh token");
            return Err(AuthError::InvalidToken);
        }

        let user = self.get_user_by_id(user_id).await?.ok_or(AuthError::InvalidToken)?;
        self.ensure_can_sign_in(&user).await?;

        let (access_token, refresh_token) = self.jwt_service.create_token_pair(subject_of(&user))?;
        self.store_refresh_token(user.id, &refresh_token).await?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
        })
    }

    /// Blacklist the current access token and revoke all refresh tokens
    pub async fn logout(&self, session: &UserSession) -> Result<MessageResponse, AuthError> {
        self.blacklist_token(&session.jti, session.exp as i64).await?;
        self.revoke_user_refresh_tokens(session.user_id).await?;

        info!(user_id = %session.user_id, "User logged out");
        Ok(MessageResponse::new("Successfully logged out"))
    }

    pub async fn is_token_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = $1 AND expires_at > NOW()")
            .bind(jti)
            .fetch_optional(&self.db)
            .await?;

        Ok(result.is_some())
    }

    /// Validate user session from an access token
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let session = self.jwt_service.extract_user_session(token)?;

        if self.is_token_blacklisted(&session.jti).await? {
            return Err(AuthError::InvalidToken);
        }

        Ok(session)
    }

    /// Always answers the same way so the endpoint cannot be used to discover
    /// which addresses have accounts.
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, AuthError> {
        let email = email.trim().to_lowercase();

        if let Some(user) = self.get_user_by_email(&email).await? {
            if user.active {
                let token = generate_reset_token();
                let mut conn = self.db.acquire().await?;
                insert_reset_token(&mut *conn, user.id, &token, Duration::hours(RESET_TOKEN_TTL_HOURS)).await?;

                let link = self.reset_link(&token);
                let mail = password_reset_email(&user.email, &user.full_name, &link, RESET_TOKEN_TTL_HOURS);
                if let Err(e) = self.mailer.send(mail).await {
                    warn!(user_id = %user.id, error = %e, "Failed to send password reset email");
                }
            }
        }

        Ok(MessageResponse::new(
            "If an account exists for this address, a reset link has been sent",
        ))
    }

    /// Consume a reset (or invitation) token and set the new password
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<MessageResponse, AuthError> {
        let password_hash = hash_password(&request.new_password)?;
        let token_hash = hash_token(&request.token);

        let mut tx = self.db.begin().await?;

        let user_id: Uuid = sqlx::query_scalar(
            "UPDATE password_reset_tokens SET used = true
             WHERE token_hash = $1 AND NOT used AND expires_at > NOW()
             RETURNING user_id",
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AuthError::InvalidResetToken)?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(%user_id, "Password reset completed");
        Ok(MessageResponse::new("Password has been reset"))
    }

    pub async fn change_password(
        &self,
        session: &UserSession,
        request: ChangePasswordRequest,
    ) -> Result<MessageResponse, AuthError> {
        let user = self
            .get_user_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(&request.current_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = hash_password(&request.new_password)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user.id)
            .execute(&self.db)
            .await?;

        info!(user_id = %user.id, "Password changed");
        Ok(MessageResponse::new("Password updated"))
    }

    pub async fn profile(&self, session: &UserSession) -> Result<UserResponse, AuthError> {
        self.get_user_by_id(session.user_id)
            .await?
            .map(UserResponse::from)
            .ok_or(AuthError::UserNotFound)
    }

    /// Create an invited account inside the caller's transaction. The returned
    /// token must be mailed with [`AuthService::send_invitation`] after commit.
    pub async fn create_invited_user(
        &self,
        conn: &mut PgConnection,
        invite: NewInvitedUser<'_>,
    ) -> Result<PendingInvitation, AuthError> {
        let email = invite.email.trim().to_lowercase();

        let exists = sqlx::query("SELECT 1 FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&generate_temporary_password())?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (tenant_id, email, password_hash, full_name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(invite.tenant_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(invite.full_name)
        .bind(invite.role)
        .fetch_one(&mut *conn)
        .await?;

        let token = generate_reset_token();
        insert_reset_token(conn, user.id, &token, Duration::hours(INVITATION_TTL_HOURS)).await?;

        info!(user_id = %user.id, tenant_id = %invite.tenant_id, role = invite.role.as_str(), "User invited");
        Ok(PendingInvitation { user, token })
    }

    /// Mail the invitation link. Delivery failures are logged, not returned.
    pub async fn send_invitation(&self, invitation: &PendingInvitation, academy_name: &str) {
        let link = self.reset_link(&invitation.token);
        let mail = invitation_email(
            &invitation.user.email,
            &invitation.user.full_name,
            academy_name,
            &link,
            INVITATION_TTL_HOURS,
        );

        if let Err(e) = self.mailer.send(mail).await {
            warn!(user_id = %invitation.user.id, error = %e, "Failed to send invitation email");
        }
    }

    /// Invite a user into a tenant in its own transaction and mail the link
    pub async fn invite_user(
        &self,
        invite: NewInvitedUser<'_>,
        academy_name: &str,
    ) -> Result<User, AuthError> {
        let mut tx = self.db.begin().await?;
        let invitation = self.create_invited_user(&mut *tx, invite).await?;
        tx.commit().await?;

        self.send_invitation(&invitation, academy_name).await;
        Ok(invitation.user)
    }

    fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.app_base_url, token)
    }

    async fn ensure_can_sign_in(&self, user: &User) -> Result<(), AuthError> {
        if !user.active {
            return Err(AuthError::AccountDisabled);
        }

        if let Some(tenant_id) = user.tenant_id {
            let status: Option<TenantStatus> =
                sqlx::query_scalar("SELECT status FROM tenants WHERE id = $1")
                    .bind(tenant_id)
                    .fetch_optional(&self.db)
                    .await?;

            match status {
                Some(status) if status.allows_login() => {}
                _ => return Err(AuthError::TenantInactive),
            }
        }

        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn store_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self.jwt_service.validate_token(refresh_token)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash_token(refresh_token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Revokes a live refresh token in one statement. False when the token is
    /// unknown, expired or already revoked.
    async fn consume_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true
             WHERE user_id = $1 AND token_hash = $2 AND expires_at > NOW() AND NOT revoked
             RETURNING id",
        )
        .bind(user_id)
        .bind(hash_token(refresh_token))
        .fetch_optional(&self.db)
        .await?;

        Ok(result.is_some())
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn blacklist_token(&self, jti: &str, exp: i64) -> Result<(), AuthError> {
        let expires_at = DateTime::<Utc>::from_timestamp(exp, 0).ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

fn subject_of(user: &User) -> TokenSubject<'_> {
    TokenSubject {
        user_id: user.id,
        email: &user.email,
        role: user.role,
        tenant_id: user.tenant_id,
    }
}

async fn insert_reset_token(
    conn: &mut PgConnection,
    user_id: Uuid,
    token: &str,
    ttl: Duration,
) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
         VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(hash_token(token))
    .bind(Utc::now() + ttl)
    .execute(conn)
    .await?;

    Ok(())
}
