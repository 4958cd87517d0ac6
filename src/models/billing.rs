use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

pub const TRIAL_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "billing_interval", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn period(&self) -> Duration {
        match self {
            BillingInterval::Monthly => Duration::days(30),
            BillingInterval::Yearly => Duration::days(365),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub billing_interval: BillingInterval,
    pub max_students: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Price normalised to one month, used for recurring revenue totals.
    pub fn monthly_price_cents(&self) -> i64 {
        match self.billing_interval {
            BillingInterval::Monthly => self.price_cents,
            BillingInterval::Yearly => self.price_cents / 12,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0))]
    pub price_cents: i64,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub billing_interval: BillingInterval,
    #[validate(range(min = 1))]
    pub max_students: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDetails {
    pub subscription: Subscription,
    pub plan: Plan,
}

#[derive(Debug, Deserialize)]
pub struct ChangeSubscriptionRequest {
    pub plan_id: Option<Uuid>,
    pub status: Option<SubscriptionStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Void,
    Uncollectible,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub tenant_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BillingPortalResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yearly_plan_normalised_to_month() {
        let plan = Plan {
            id: Uuid::new_v4(),
            name: "Pro".to_string(),
            price_cents: 120_000,
            currency: "BRL".to_string(),
            billing_interval: BillingInterval::Yearly,
            max_students: None,
            active: true,
            created_at: Utc::now(),
        };
        assert_eq!(plan.monthly_price_cents(), 10_000);
    }
}
