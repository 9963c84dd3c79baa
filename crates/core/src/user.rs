//! User references as seen by the task core.
//!
//! Authentication lives outside this crate; tasks and notifications only
//! need a display name and an e-mail address for each referenced user.

use serde::Serialize;

use crate::types::DbId;

/// A resolved user reference (`{ id, name, email }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: DbId,
    pub name: String,
    pub email: String,
}
