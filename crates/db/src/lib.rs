//! Job persistence for reelgen.
//!
//! [`JobStore`] is the seam the runner and the HTTP layer talk to. Two
//! implementations ship here:
//!
//! - [`JobRepo`] -- PostgreSQL via `sqlx`, with embedded migrations.
//! - [`MemoryJobStore`] -- in-process map for tests and database-less runs.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod repositories;
pub mod store;

pub use memory::MemoryJobStore;
pub use repositories::JobRepo;
pub use store::{JobStore, StoreError, StoreResult};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
