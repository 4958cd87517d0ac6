use serde::Serialize;

use crate::models::{Assessment, ScheduleSlot};

/// Summary shown to tenant staff on the home screen.
#[derive(Debug, Serialize)]
pub struct TenantDashboard {
    pub active_students: i64,
    pub total_students: i64,
    pub todays_slots: Vec<ScheduleSlot>,
    pub unread_messages: i64,
    pub assessments_this_month: i64,
    pub recent_assessments: Vec<Assessment>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TenantStatusCount {
    pub status: crate::models::TenantStatus,
    pub count: i64,
}

/// Back-office overview for the super-admin.
#[derive(Debug, Serialize)]
pub struct PlatformOverview {
    pub tenants_by_status: Vec<TenantStatusCount>,
    pub total_tenants: i64,
    pub active_subscriptions: i64,
    pub monthly_recurring_revenue_cents: i64,
    pub open_invoices: i64,
    pub total_students: i64,
}
