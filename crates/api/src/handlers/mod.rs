pub mod notification;
pub mod task;
