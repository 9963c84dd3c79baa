//! External delivery channels for task notifications.

pub mod email;
