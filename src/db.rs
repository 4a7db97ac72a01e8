use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, SqlxPostgresConnector};
use sqlx::{migrate::Migrator, postgres::PgPoolOptions};

pub type DbPool = sqlx::PgPool;
pub type OrmConn = DatabaseConnection;

/// `migrations/*.sql`, embedded at build time and tracked in `_sqlx_migrations`.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create the shared Postgres pool.
pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Wrap an existing pool in a SeaORM connection so both layers share connections.
pub fn orm_from_pool(pool: DbPool) -> OrmConn {
    SqlxPostgresConnector::from_sqlx_postgres_pool(pool)
}

/// Apply pending migrations. Returns how many the binary embeds.
pub async fn run_migrations(pool: &DbPool) -> Result<usize> {
    MIGRATOR
        .run(pool)
        .await
        .context("running database migrations")?;
    let known = MIGRATOR.iter().count();
    tracing::info!(migrations = known, "database schema is up to date");
    Ok(known)
}
