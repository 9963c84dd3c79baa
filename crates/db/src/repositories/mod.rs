//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod lead_repo;
pub mod notification_repo;
pub mod task_repo;
pub mod task_update_repo;
pub mod user_repo;

pub use lead_repo::LeadRepo;
pub use notification_repo::NotificationRepo;
pub use task_repo::TaskRepo;
pub use task_update_repo::TaskUpdateRepo;
pub use user_repo::UserRepo;
