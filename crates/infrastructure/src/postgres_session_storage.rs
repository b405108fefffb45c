//! PostgreSQL-backed session storage.
//!
//! Rows live in one table keyed by `(identity, occurred_at)`. The default
//! table is created by the bundled migrations; a custom table name must point
//! at a table with the same shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use geosession_application::SessionStorage;
use geosession_core::{AppError, AppResult};
use geosession_domain::{Identity, Place, SessionRecord, SessionTimestamp, SortDirection};

#[cfg(test)]
mod tests;

/// Table created by the bundled migrations.
pub const DEFAULT_SESSION_TABLE: &str = "session_history";

/// PostgreSQL implementation of the session storage port.
#[derive(Clone)]
pub struct PostgresSessionStorage {
    pool: PgPool,
    table_name: String,
}

impl PostgresSessionStorage {
    /// Creates a storage over a pool and a validated table name.
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> AppResult<Self> {
        let table_name = table_name.into();
        validate_table_name(table_name.as_str())?;

        Ok(Self { pool, table_name })
    }

    /// Returns the table this storage writes to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table_name.as_str()
    }
}

fn validate_table_name(table_name: &str) -> AppResult<()> {
    let mut characters = table_name.chars();
    let starts_well = characters
        .next()
        .is_some_and(|first| first.is_ascii_lowercase() || first == '_');
    let rest_valid = characters.all(|character| {
        character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
    });

    if !starts_well || !rest_valid || table_name.len() > 63 {
        return Err(AppError::Validation(format!(
            "session table name '{table_name}' must be a lowercase SQL identifier of at most 63 characters"
        )));
    }

    Ok(())
}

#[async_trait]
impl SessionStorage for PostgresSessionStorage {
    async fn put_record(&self, record: &SessionRecord) -> AppResult<()> {
        let statement = format!(
            "INSERT INTO {} (identity, occurred_at, source_address, place) VALUES ($1, $2, $3, $4)",
            self.table_name
        );

        let result = sqlx::query(statement.as_str())
            .bind(record.identity().as_str())
            .bind(record.occurred_at().as_datetime())
            .bind(record.source_address())
            .bind(record.place().as_str())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "session '{}' already exists for identity '{}'",
                        record.occurred_at(),
                        record.identity()
                    )));
                }

                Err(AppError::Unavailable(format!(
                    "failed to insert session record: {error}"
                )))
            }
        }
    }

    async fn count_records(&self, identity: &Identity) -> AppResult<u64> {
        let statement = format!("SELECT COUNT(*) FROM {} WHERE identity = $1", self.table_name);

        let count = sqlx::query_scalar::<_, i64>(statement.as_str())
            .bind(identity.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("failed to count session records: {error}"))
            })?;

        u64::try_from(count)
            .map_err(|error| AppError::Internal(format!("invalid session record count: {error}")))
    }

    async fn query_records(
        &self,
        identity: &Identity,
        direction: SortDirection,
        limit: usize,
    ) -> AppResult<Vec<SessionRecord>> {
        let order = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let statement = format!(
            r#"
            SELECT identity, occurred_at, source_address, place
            FROM {}
            WHERE identity = $1
            ORDER BY occurred_at {order}
            LIMIT $2
            "#,
            self.table_name
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, SessionRow>(statement.as_str())
            .bind(identity.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("failed to query session records: {error}"))
            })?;

        rows.into_iter().map(SessionRow::into_record).collect()
    }

    async fn delete_record(
        &self,
        identity: &Identity,
        occurred_at: SessionTimestamp,
    ) -> AppResult<()> {
        let statement = format!(
            "DELETE FROM {} WHERE identity = $1 AND occurred_at = $2",
            self.table_name
        );

        sqlx::query(statement.as_str())
            .bind(identity.as_str())
            .bind(occurred_at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("failed to delete session record: {error}"))
            })?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    identity: String,
    occurred_at: DateTime<Utc>,
    source_address: String,
    place: String,
}

impl SessionRow {
    fn into_record(self) -> AppResult<SessionRecord> {
        Ok(SessionRecord::new(
            Identity::new(self.identity)?,
            SessionTimestamp::from_datetime(self.occurred_at),
            self.source_address,
            Place::new(self.place),
        ))
    }
}
