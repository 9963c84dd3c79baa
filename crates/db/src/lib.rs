//! PostgreSQL persistence for tasks, timelines, and notifications.
//!
//! Repositories in [`repositories`] are thin SQL wrappers returning
//! `sqlx::Error`; [`PgStore`] adapts them to the domain store traits and
//! classifies database failures into [`CoreError`](taskboard_core::error::CoreError).

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod pg_store;
pub mod repositories;

pub use pg_store::PgStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
