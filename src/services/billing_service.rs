use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{
    page_bounds, ChangeSubscriptionRequest, CreatePlanRequest, Invoice, InvoiceQuery, Page, Plan,
    Subscription, SubscriptionDetails, SubscriptionStatus, TRIAL_DAYS,
};
use crate::services::DomainError;

const PLAN_COLUMNS: &str = "id, name, price_cents, currency, billing_interval, max_students, active, created_at";
const SUBSCRIPTION_COLUMNS: &str = "id, tenant_id, plan_id, status, current_period_end, created_at, updated_at";
const INVOICE_COLUMNS: &str = "id, tenant_id, amount_cents, currency, status, issued_at, due_at, paid_at";

/// Plans, subscriptions and invoices. Payment collection itself happens in
/// the external billing portal.
#[derive(Clone)]
pub struct BillingService {
    db: PgPool,
    portal_url: String,
}

impl BillingService {
    pub fn new(db: PgPool, portal_url: &str) -> Self {
        Self {
            db,
            portal_url: portal_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_plans(&self, include_inactive: bool) -> Result<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE active OR $1 ORDER BY price_cents"
        ))
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(plans)
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Option<Plan>> {
        let plan = sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"))
            .bind(plan_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(plan)
    }

    pub async fn create_plan(&self, request: &CreatePlanRequest) -> Result<Plan> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "INSERT INTO plans (name, price_cents, currency, billing_interval, max_students)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(&request.name)
        .bind(request.price_cents)
        .bind(request.currency.as_deref().unwrap_or("BRL").to_uppercase())
        .bind(request.billing_interval)
        .bind(request.max_students)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(plan_id = %plan.id, name = %plan.name, "Plan created");
        Ok(plan)
    }

    /// Trial subscription for a freshly provisioned tenant
    pub async fn create_trial_subscription(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Subscription> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "INSERT INTO subscriptions (tenant_id, plan_id, status, current_period_end)
             VALUES ($1, $2, 'trialing', $3)
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(plan_id)
        .bind(Utc::now() + Duration::days(TRIAL_DAYS))
        .fetch_one(conn)
        .await?;

        Ok(subscription)
    }

    pub async fn subscription_for_tenant(&self, tenant_id: Uuid) -> Result<Option<SubscriptionDetails>> {
        let Some(subscription) = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE tenant_id = $1"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        else {
            return Ok(None);
        };

        let plan = self
            .get_plan(subscription.plan_id)
            .await?
            .ok_or(DomainError::NotFound("Plan"))?;

        Ok(Some(SubscriptionDetails { subscription, plan }))
    }

    /// Move a tenant to another plan and/or subscription status. A plan change
    /// starts a new billing period.
    pub async fn change_subscription(
        &self,
        tenant_id: Uuid,
        request: &ChangeSubscriptionRequest,
    ) -> Result<Option<SubscriptionDetails>> {
        if request.plan_id.is_none() && request.status.is_none() {
            return Err(DomainError::invalid_input("Nothing to change"));
        }

        let new_plan = match request.plan_id {
            Some(plan_id) => {
                let plan = self.get_plan(plan_id).await?.ok_or(DomainError::NotFound("Plan"))?;
                if !plan.active {
                    return Err(DomainError::invalid_state("Plan is no longer offered"));
                }
                Some(plan)
            }
            None => None,
        };

        let mut tx = self.db.begin().await?;

        let period_end = new_plan
            .as_ref()
            .map(|plan| Utc::now() + plan.billing_interval.period());

        let updated = sqlx::query_as::<_, Subscription>(&format!(
            "UPDATE subscriptions SET
                plan_id = COALESCE($2, plan_id),
                status = COALESCE($3, status),
                current_period_end = COALESCE($4, current_period_end),
                updated_at = NOW()
             WHERE tenant_id = $1
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(request.plan_id)
        .bind(request.status)
        .bind(period_end)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(subscription) = updated else {
            return Ok(None);
        };

        if let Some(plan_id) = request.plan_id {
            sqlx::query("UPDATE tenants SET plan_id = $1, updated_at = NOW() WHERE id = $2")
                .bind(plan_id)
                .bind(tenant_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let plan = match new_plan {
            Some(plan) => plan,
            None => self
                .get_plan(subscription.plan_id)
                .await?
                .ok_or(DomainError::NotFound("Plan"))?,
        };

        tracing::info!(%tenant_id, status = ?subscription.status, "Subscription changed");
        Ok(Some(SubscriptionDetails { subscription, plan }))
    }

    pub async fn cancel_subscription(conn: &mut PgConnection, tenant_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET status = $1, updated_at = NOW() WHERE tenant_id = $2")
            .bind(SubscriptionStatus::Canceled)
            .bind(tenant_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<Invoice>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);
        let filter = "($1::uuid IS NULL OR tenant_id = $1) AND ($2::invoice_status IS NULL OR status = $2)";

        let items = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE {filter}
             ORDER BY issued_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(query.tenant_id)
        .bind(query.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM invoices WHERE {filter}"))
            .bind(query.tenant_id)
            .bind(query.status)
            .fetch_one(&self.db)
            .await?;

        Ok(Page { items, total, limit, offset })
    }

    /// Plans of paying subscriptions, one entry per subscription
    pub async fn active_subscription_plans(&self) -> Result<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans
             JOIN (SELECT plan_id FROM subscriptions WHERE status = 'active') s ON s.plan_id = plans.id"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(plans)
    }

    /// Hosted billing portal for a tenant
    pub fn portal_url(&self, tenant_id: Uuid) -> String {
        format!("{}?tenant={}", self.portal_url, tenant_id)
    }
}
