use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::AuthError;
use crate::models::{validation::validate_password_confirmation, UserResponse};

/// User roles for role-based access control
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Trainer,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Trainer => "trainer",
            UserRole::Student => "student",
        }
    }

    /// Admins and trainers of a tenant
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Trainer)
    }

    /// Roles a tenant admin may hand out through team invitations
    pub fn is_invitable_team_role(&self) -> bool {
        self.is_staff()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    pub email: String,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,  // None only for super-admins
    pub typ: TokenType,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,              // JWT ID (for revocation)
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "reset_passwords_match"))]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    pub new_password: String,
    pub password_confirmation: String,
}

fn reset_passwords_match(request: &ResetPasswordRequest) -> Result<(), ValidationError> {
    validate_password_confirmation(&request.new_password, &request.password_confirmation)
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "changed_passwords_match"))]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub password_confirmation: String,
}

fn changed_passwords_match(request: &ChangePasswordRequest) -> Result<(), ValidationError> {
    validate_password_confirmation(&request.new_password, &request.password_confirmation)
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Authenticated caller, attached to the request by the JWT middleware
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
    pub jti: String,
    pub exp: usize,
}

impl UserSession {
    pub fn from_claims(claims: &Claims) -> Result<Self, uuid::Error> {
        Ok(Self {
            user_id: Uuid::parse_str(&claims.sub)?,
            email: claims.email.clone(),
            role: claims.role,
            tenant_id: claims.tenant_id,
            jti: claims.jti.clone(),
            exp: claims.exp,
        })
    }

    /// Tenant of the caller; super-admins have none.
    pub fn tenant_id(&self) -> Result<Uuid, AuthError> {
        self.tenant_id.ok_or(AuthError::InsufficientPermissions)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    /// Tenant id of an admin or trainer caller
    pub fn require_staff(&self) -> Result<Uuid, AuthError> {
        if !self.role.is_staff() {
            return Err(AuthError::InsufficientPermissions);
        }
        self.tenant_id()
    }

    /// Tenant id of an admin caller
    pub fn require_admin(&self) -> Result<Uuid, AuthError> {
        if self.role != UserRole::Admin {
            return Err(AuthError::InsufficientPermissions);
        }
        self.tenant_id()
    }

    /// Tenant id of a student caller
    pub fn require_student(&self) -> Result<Uuid, AuthError> {
        if self.role != UserRole::Student {
            return Err(AuthError::InsufficientPermissions);
        }
        self.tenant_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole, tenant_id: Option<Uuid>) -> UserSession {
        UserSession {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
            tenant_id,
            jti: Uuid::new_v4().to_string(),
            exp: 0,
        }
    }

    #[test]
    fn test_role_guards() {
        let tenant = Uuid::new_v4();

        assert_eq!(session(UserRole::Admin, Some(tenant)).require_admin().unwrap(), tenant);
        assert_eq!(session(UserRole::Trainer, Some(tenant)).require_staff().unwrap(), tenant);
        assert!(session(UserRole::Trainer, Some(tenant)).require_admin().is_err());
        assert!(session(UserRole::Student, Some(tenant)).require_staff().is_err());
        assert!(session(UserRole::SuperAdmin, None).require_staff().is_err());
        assert!(session(UserRole::SuperAdmin, None).tenant_id().is_err());
    }

    #[test]
    fn test_reset_password_confirmation() {
        let request = ResetPasswordRequest {
            token: "abc".to_string(),
            new_password: "NewPassword1!".to_string(),
            password_confirmation: "NewPassword2!".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&UserRole::SuperAdmin).unwrap(), "\"super_admin\"");
        let role: UserRole = serde_json::from_str("\"trainer\"").unwrap();
        assert_eq!(role, UserRole::Trainer);
    }
}
