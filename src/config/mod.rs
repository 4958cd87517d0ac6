pub mod app;
pub mod database;
pub mod logging;
pub mod seeding;

pub use app::*;
pub use database::*;
pub use logging::*;
pub use seeding::*;
