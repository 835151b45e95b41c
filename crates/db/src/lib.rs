//! Quizmill PostgreSQL storage layer.
//!
//! Row models, repositories, and the [`PgCatalogStore`] /
//! [`PgCapabilityProbe`] implementations of the importer's collaborator
//! contracts.

pub mod models;
pub mod repositories;
pub mod store;

pub use store::{PgCapabilityProbe, PgCatalogStore};

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Apply pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
