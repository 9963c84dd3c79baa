//! Repository for the `leads` table.

use sqlx::PgPool;
use taskboard_core::types::DbId;

pub struct LeadRepo;

impl LeadRepo {
    /// Insert a lead, returning the generated ID.
    pub async fn create(pool: &PgPool, name: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO leads (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM leads WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
