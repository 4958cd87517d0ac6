use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PlatformOverview, TenantDashboard, TenantStatusCount};
use crate::services::{AssessmentService, BillingService, MessageService, ScheduleService};

const RECENT_ASSESSMENTS: i64 = 5;

/// Read-only summaries for tenant staff and the platform back office
#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
    assessments: AssessmentService,
    schedule: ScheduleService,
    messages: MessageService,
    billing: BillingService,
}

impl DashboardService {
    pub fn new(db: PgPool, billing: BillingService) -> Self {
        Self {
            assessments: AssessmentService::new(db.clone()),
            schedule: ScheduleService::new(db.clone()),
            messages: MessageService::new(db.clone()),
            billing,
            db,
        }
    }

    pub async fn tenant_dashboard(&self, tenant_id: Uuid, user_id: Uuid) -> Result<TenantDashboard> {
        let (active_students, total_students): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE status = 'active'), COUNT(*)
             FROM students WHERE tenant_id = $1 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .fetch_one(&self.db)
        .await?;

        let today = Utc::now().date_naive();

        Ok(TenantDashboard {
            active_students,
            total_students,
            todays_slots: self.schedule.slots_on(tenant_id, today).await?,
            unread_messages: self.messages.unread_total(tenant_id, user_id).await?,
            assessments_this_month: self.assessments.count_this_month(tenant_id).await?,
            recent_assessments: self.assessments.recent(tenant_id, RECENT_ASSESSMENTS).await?,
        })
    }

    pub async fn platform_overview(&self) -> Result<PlatformOverview> {
        let tenants_by_status = sqlx::query_as::<_, TenantStatusCount>(
            "SELECT status, COUNT(*) AS count FROM tenants GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.db)
        .await?;
        let total_tenants = tenants_by_status.iter().map(|row| row.count).sum();

        let (active_subscriptions, open_invoices, total_students): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM subscriptions WHERE status IN ('active', 'trialing')),
                (SELECT COUNT(*) FROM invoices WHERE status = 'open'),
                (SELECT COUNT(*) FROM students WHERE deleted_at IS NULL)",
        )
        .fetch_one(&self.db)
        .await?;

        let monthly_recurring_revenue_cents = self
            .billing
            .active_subscription_plans()
            .await?
            .iter()
            .map(|plan| plan.monthly_price_cents())
            .sum();

        Ok(PlatformOverview {
            tenants_by_status,
            total_tenants,
            active_subscriptions,
            monthly_recurring_revenue_cents,
            open_invoices,
            total_students,
        })
    }
}
