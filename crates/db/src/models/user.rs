//! User row model.

use sqlx::FromRow;
use taskboard_core::types::DbId;
use taskboard_core::user::UserRef;

/// Display identity columns from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub name: String,
    pub email: String,
}

impl From<UserRow> for UserRef {
    fn from(row: UserRow) -> Self {
        UserRef {
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}
