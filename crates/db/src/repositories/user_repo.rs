//! Repository for the `users` table.

use sqlx::PgPool;
use taskboard_core::types::DbId;

use crate::models::user::UserRow;

/// Column list for `users` queries.
const COLUMNS: &str = "id, name, email";

/// Read access to user display identities.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user, returning the created row.
    pub async fn create(pool: &PgPool, name: &str, email: &str) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(name)
            .bind(email)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load every user whose id is in `ids`. Missing ids are skipped.
    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
