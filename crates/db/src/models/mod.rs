//! Row structs for the taskboard tables.
//!
//! Each submodule holds a `FromRow` struct matching a table row and the
//! conversion into its domain type. Enumerated columns are stored as `TEXT`
//! and parsed during conversion.

pub mod notification;
pub mod task;
pub mod user;

use taskboard_core::error::CoreError;

/// A stored enum value that no longer parses means the row was written
/// outside this crate's control.
pub(crate) fn corrupt(column: &str, err: CoreError) -> CoreError {
    CoreError::Internal(format!("Corrupt {column} column: {err}"))
}
