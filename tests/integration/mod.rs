// Full request/response cycles through the router.
// Tests that need Postgres return early unless TEST_DATABASE_URL is set.

pub mod auth_guard_test;
pub mod scheduling_test;
pub mod session_test;
pub mod tenant_isolation_test;
pub mod workout_log_test;
