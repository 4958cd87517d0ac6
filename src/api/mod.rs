// API routes and handlers

pub mod error;
pub mod extract;
pub mod health;
pub mod response;
pub mod routes;

pub mod admin;
pub mod assessments;
pub mod auth;
pub mod auto_messages;
pub mod billing;
pub mod dashboard;
pub mod me;
pub mod messages;
pub mod notifications;
pub mod schedule;
pub mod students;
pub mod team;
pub mod workouts;

pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::{create_routes, create_routes_with_mailer};
