//! StoryHub persistence layer.
//!
//! Story metadata (`story_details`) and story content (`story_content`) live in
//! two independent tables. [`repositories::StoryRepository`] is the only
//! writer of either and owns their pairwise consistency.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Upper bound for a single request-path storage operation.
pub const STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for the liveness round-trip.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(STORAGE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
