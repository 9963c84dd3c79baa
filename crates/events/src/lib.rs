//! Outbound notification channels for the taskboard.
//!
//! In-app notifications are rows written by the lifecycle service; this
//! crate carries the side channels that leave the process. Currently that is
//! SMTP e-mail through [`EmailDelivery`], which implements the core
//! [`Mailer`](taskboard_core::store::Mailer) trait.

pub mod delivery;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
