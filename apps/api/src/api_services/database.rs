use std::time::Duration;

use geosession_core::AppError;
use geosession_infrastructure::PostgresSessionStorage;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(|error| {
            AppError::Unavailable(format!("failed to connect to session database: {error}"))
        })?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to migrate session history schema: {error}"))
        })?;

    Ok(pool)
}

/// Connects, applies the session history migrations and binds the storage to its table.
pub async fn build_postgres_storage(
    database_url: &str,
    table_name: &str,
) -> Result<PostgresSessionStorage, AppError> {
    let pool = connect_and_migrate(database_url).await?;
    let storage = PostgresSessionStorage::new(pool, table_name)?;

    info!(
        backend = "postgres",
        table = storage.table_name(),
        "session storage configured"
    );
    Ok(storage)
}
