// Business logic services

pub mod body_composition;
pub mod message_template;
pub mod recurring_schedule;

pub mod assessment_service;
pub mod audit_service;
pub mod auto_message_service;
pub mod billing_service;
pub mod dashboard_service;
pub mod domain_error;
pub mod mailer;
pub mod message_service;
pub mod notification_service;
pub mod schedule_service;
pub mod student_service;
pub mod tenant_service;
pub mod user_service;
pub mod workout_service;

pub use assessment_service::AssessmentService;
pub use audit_service::AuditService;
pub use auto_message_service::AutoMessageService;
pub use billing_service::BillingService;
pub use dashboard_service::DashboardService;
pub use domain_error::DomainError;
pub use mailer::{LogMailer, Mailer, OutgoingEmail};
pub use message_service::MessageService;
pub use notification_service::NotificationService;
pub use schedule_service::ScheduleService;
pub use student_service::StudentService;
pub use tenant_service::TenantService;
pub use user_service::UserService;
pub use workout_service::WorkoutService;
