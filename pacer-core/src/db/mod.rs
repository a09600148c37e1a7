//! The relational read model: event metadata, course categories,
//! participant profiles and tracker relationships. The core only reads;
//! the seeding helpers exist for tests and the simulator.

pub mod models;
pub mod queries;
pub mod seed;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

pub async fn create_pool(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await?;
    info!(url = %url, "read model connected");
    Ok(pool)
}

/// In-memory database for tests and the simulator. A single connection
/// keeps every query on the same database instance.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let migrations = [include_str!("../../migrations/001_read_model.sql")];

    for migration_sql in &migrations {
        for statement in migration_sql.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(pool).await?;
            }
        }
    }

    info!("read model migrations applied");
    Ok(())
}
