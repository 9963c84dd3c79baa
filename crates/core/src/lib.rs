//! Taskboard domain core.
//!
//! Pure domain types and the task lifecycle service. Persistence, e-mail,
//! and blob storage are reached through the traits in [`store`] so the
//! service stays free of database and HTTP dependencies.

pub mod error;
pub mod fanout;
pub mod lifecycle;
pub mod memory;
pub mod notification;
pub mod page;
pub mod store;
pub mod task;
pub mod types;
pub mod user;
