use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "tenant_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    Academy,
    Personal, // Independent trainer
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "tenant_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Trial,
    Active,
    Suspended,
    Canceled,
}

impl TenantStatus {
    /// Users of suspended or canceled tenants cannot sign in.
    pub fn allows_login(&self) -> bool {
        matches!(self, TenantStatus::Trial | TenantStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub tenant_type: TenantType,
    pub plan_id: Option<Uuid>,
    pub status: TenantStatus,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    pub tenant_type: TenantType,
    pub plan_id: Uuid,
    #[validate(length(min = 2, max = 200))]
    pub owner_name: String,
    #[validate(email)]
    pub owner_email: String,
    #[validate(length(max = 50))]
    pub owner_phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 2, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 200))]
    pub owner_name: Option<String>,
    #[validate(email)]
    pub owner_email: Option<String>,
    #[validate(length(max = 50))]
    pub owner_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantStatusRequest {
    pub status: TenantStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub status: Option<TenantStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of provisioning a tenant: the tenant plus its invited owner.
#[derive(Debug, Serialize)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub owner_user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_status_login() {
        assert!(TenantStatus::Trial.allows_login());
        assert!(TenantStatus::Active.allows_login());
        assert!(!TenantStatus::Suspended.allows_login());
        assert!(!TenantStatus::Canceled.allows_login());
    }

    #[test]
    fn test_tenant_type_serde() {
        let parsed: TenantType = serde_json::from_str("\"academy\"").unwrap();
        assert_eq!(parsed, TenantType::Academy);
        assert_eq!(serde_json::to_string(&TenantType::Personal).unwrap(), "\"personal\"");
    }
}
