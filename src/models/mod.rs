// Domain records and request/response payloads

pub mod assessment;
pub mod audit_log;
pub mod auto_message;
pub mod billing;
pub mod dashboard;
pub mod message;
pub mod notification;
pub mod pagination;
pub mod schedule;
pub mod student;
pub mod tenant;
pub mod user;
pub mod validation;
pub mod workout;

pub use assessment::*;
pub use audit_log::*;
pub use auto_message::*;
pub use billing::*;
pub use dashboard::*;
pub use message::*;
pub use notification::*;
pub use pagination::*;
pub use schedule::*;
pub use student::*;
pub use tenant::*;
pub use user::*;
pub use workout::*;
