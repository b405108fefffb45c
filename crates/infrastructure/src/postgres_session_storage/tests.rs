use chrono::Utc;
use geosession_application::SessionStorage;
use geosession_core::{AppError, AppResult};
use geosession_domain::{Identity, Place, SessionRecord, SessionTimestamp, SortDirection};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::{DEFAULT_SESSION_TABLE, PostgresSessionStorage, validate_table_name};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres session storage tests: {error}");
    }

    Some(pool)
}

fn unique_identity(label: &str) -> AppResult<Identity> {
    Identity::new(format!(
        "{label}-{}@example.com",
        Utc::now().timestamp_micros()
    ))
}

fn record(identity: &Identity, micros: i64, place: &str) -> AppResult<SessionRecord> {
    Ok(SessionRecord::new(
        identity.clone(),
        SessionTimestamp::from_unix_micros(micros)?,
        "190.0.2.10",
        Place::new(place),
    ))
}

#[test]
fn table_name_must_be_a_plain_identifier() {
    assert!(validate_table_name(DEFAULT_SESSION_TABLE).is_ok());
    assert!(validate_table_name("_sessions_v2").is_ok());
    assert!(validate_table_name("").is_err());
    assert!(validate_table_name("2sessions").is_err());
    assert!(validate_table_name("Sessions").is_err());
    assert!(validate_table_name("sessions; DROP TABLE users").is_err());
    assert!(validate_table_name(&"s".repeat(64)).is_err());
}

#[tokio::test]
async fn round_trips_records_in_both_directions() -> AppResult<()> {
    let Some(pool) = test_pool().await else {
        return Ok(());
    };
    let storage = PostgresSessionStorage::new(pool, DEFAULT_SESSION_TABLE)?;
    let identity = unique_identity("pg-order")?;

    for micros in [1_000_003, 1_000_001, 1_000_002] {
        storage
            .put_record(&record(&identity, micros, "Bogotá")?)
            .await?;
    }

    let ascending = storage
        .query_records(&identity, SortDirection::Ascending, 10)
        .await?;
    let newest = storage
        .query_records(&identity, SortDirection::Descending, 1)
        .await?;

    let ascending_micros: Vec<i64> = ascending
        .iter()
        .map(|record| record.occurred_at().as_unix_micros())
        .collect();
    assert_eq!(ascending_micros, vec![1_000_001, 1_000_002, 1_000_003]);
    assert_eq!(ascending[0].place().as_str(), "Bogotá");
    assert_eq!(ascending[0].source_address(), "190.0.2.10");
    assert_eq!(
        newest
            .first()
            .map(|record| record.occurred_at().as_unix_micros()),
        Some(1_000_003)
    );
    assert_eq!(storage.count_records(&identity).await?, 3);
    Ok(())
}

#[tokio::test]
async fn delete_is_idempotent() -> AppResult<()> {
    let Some(pool) = test_pool().await else {
        return Ok(());
    };
    let storage = PostgresSessionStorage::new(pool, DEFAULT_SESSION_TABLE)?;
    let identity = unique_identity("pg-delete")?;
    let stored = record(&identity, 2_000_000, "Lima")?;
    storage.put_record(&stored).await?;

    storage
        .delete_record(&identity, stored.occurred_at())
        .await?;
    storage
        .delete_record(&identity, stored.occurred_at())
        .await?;

    assert_eq!(storage.count_records(&identity).await?, 0);
    Ok(())
}

#[tokio::test]
async fn duplicate_sort_key_is_a_conflict() -> AppResult<()> {
    let Some(pool) = test_pool().await else {
        return Ok(());
    };
    let storage = PostgresSessionStorage::new(pool, DEFAULT_SESSION_TABLE)?;
    let identity = unique_identity("pg-conflict")?;
    storage
        .put_record(&record(&identity, 3_000_000, "Quito")?)
        .await?;

    let duplicate = storage
        .put_record(&record(&identity, 3_000_000, "Cali")?)
        .await;

    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    Ok(())
}
