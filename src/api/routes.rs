use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use super::admin::admin_routes;
use super::assessments::assessment_routes;
use super::auth::auth_routes;
use super::auto_messages::auto_message_routes;
use super::billing::billing_routes;
use super::dashboard::dashboard_routes;
use super::health::health_check;
use super::me::me_routes;
use super::messages::conversation_routes;
use super::notifications::notification_routes;
use super::schedule::schedule_routes;
use super::students::student_routes;
use super::team::team_routes;
use super::workouts::workout_routes;
use crate::auth::{cors_layer, security_headers_layer, AuthService, RateLimiter};
use crate::config::AppConfig;
use crate::services::{BillingService, DashboardService, LogMailer, Mailer};

pub fn create_routes(db: PgPool, config: &AppConfig) -> Router {
    create_routes_with_mailer(db, config, Arc::new(LogMailer))
}

pub fn create_routes_with_mailer(db: PgPool, config: &AppConfig, mailer: Arc<dyn Mailer>) -> Router {
    let auth_service = AuthService::new(db.clone(), &config.jwt_secret, mailer, &config.app_base_url);
    let login_limiter = RateLimiter::per_minute(config.login_rate_limit_per_minute)
        .trusting_proxy_headers(config.trust_proxy_headers);
    let billing = BillingService::new(db.clone(), &config.billing_portal_url);
    let dashboard = DashboardService::new(db.clone(), billing.clone());

    let api = Router::new()
        .nest("/auth", auth_routes(auth_service.clone(), login_limiter))
        .nest("/admin", admin_routes(db.clone(), auth_service.clone(), billing.clone()))
        .nest("/students", student_routes(db.clone(), auth_service.clone()))
        .nest("/workouts", workout_routes(db.clone(), auth_service.clone()))
        .nest("/assessments", assessment_routes(db.clone(), auth_service.clone()))
        .nest("/schedule", schedule_routes(db.clone(), auth_service.clone()))
        .nest("/conversations", conversation_routes(db.clone(), auth_service.clone()))
        .nest("/notifications", notification_routes(db.clone(), auth_service.clone()))
        .nest("/auto-messages", auto_message_routes(db.clone(), auth_service.clone()))
        .nest("/team", team_routes(db.clone(), auth_service.clone()))
        .nest("/billing", billing_routes(billing, auth_service.clone()))
        .nest("/dashboard", dashboard_routes(dashboard, auth_service.clone()))
        .nest("/me", me_routes(db.clone(), auth_service));

    Router::new()
        .route("/health", get(health_check))
        .with_state(db)
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(security_headers_layer())
        .layer(cors_layer())
}
