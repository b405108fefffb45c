//! Redis-backed session storage.
//!
//! Each identity owns one sorted set. Members are JSON documents and the score
//! is the sort key in epoch microseconds, which is exact in a double for any
//! realistic date. A score identifies at most one member; a write to an
//! occupied score is refused.

use async_trait::async_trait;
use redis::{AsyncCommands, Script};
use serde::{Deserialize, Serialize};

use geosession_application::SessionStorage;
use geosession_core::{AppError, AppResult};
use geosession_domain::{Identity, Place, SessionRecord, SessionTimestamp, SortDirection};


const PUT_RECORD_SCRIPT: &str = r#"
if redis.call('ZCOUNT', KEYS[1], ARGV[1], ARGV[1]) > 0 then
  return 0
end
return redis.call('ZADD', KEYS[1], ARGV[1], ARGV[2])
"#;

/// Redis implementation of the session storage port.
#[derive(Clone)]
pub struct RedisSessionStorage {
    client: redis::Client,
    key_prefix: String,
}

impl RedisSessionStorage {
    /// Creates a storage with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, identity: &Identity) -> String {
        format!("{}:{identity}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Unavailable(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl SessionStorage for RedisSessionStorage {
    async fn put_record(&self, record: &SessionRecord) -> AppResult<()> {
        let member = StoredSessionRecord::from_record(record).to_json()?;
        let mut connection = self.connection().await?;

        let added = Script::new(PUT_RECORD_SCRIPT)
            .key(self.key_for(record.identity()))
            .arg(record.occurred_at().as_unix_micros())
            .arg(member)
            .invoke_async::<i64>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("failed to insert session record: {error}"))
            })?;

        if added == 0 {
            return Err(AppError::Conflict(format!(
                "session '{}' already exists for identity '{}'",
                record.occurred_at(),
                record.identity()
            )));
        }

        Ok(())
    }

    async fn count_records(&self, identity: &Identity) -> AppResult<u64> {
        let mut connection = self.connection().await?;

        let count: u64 = connection
            .zcard(self.key_for(identity))
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("failed to count session records: {error}"))
            })?;

        Ok(count)
    }

    async fn query_records(
        &self,
        identity: &Identity,
        direction: SortDirection,
        limit: usize,
    ) -> AppResult<Vec<SessionRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let key = self.key_for(identity);
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);
        let mut connection = self.connection().await?;

        let members: Vec<String> = match direction {
            SortDirection::Ascending => connection.zrange(key, 0, stop).await,
            SortDirection::Descending => connection.zrevrange(key, 0, stop).await,
        }
        .map_err(|error| {
            AppError::Unavailable(format!("failed to query session records: {error}"))
        })?;

        members
            .iter()
            .map(|member| StoredSessionRecord::from_json(member)?.into_record())
            .collect()
    }

    async fn delete_record(
        &self,
        identity: &Identity,
        occurred_at: SessionTimestamp,
    ) -> AppResult<()> {
        let score = occurred_at.as_unix_micros();
        let mut connection = self.connection().await?;

        connection
            .zrembyscore::<_, _, _, i64>(self.key_for(identity), score, score)
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("failed to delete session record: {error}"))
            })?;

        Ok(())
    }
}

/// Sorted-set member representation of a session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredSessionRecord {
    identity: String,
    occurred_at: String,
    source_address: String,
    place: String,
}

impl StoredSessionRecord {
    fn from_record(record: &SessionRecord) -> Self {
        Self {
            identity: record.identity().as_str().to_owned(),
            occurred_at: record.occurred_at().to_sortable_string(),
            source_address: record.source_address().to_owned(),
            place: record.place().as_str().to_owned(),
        }
    }

    fn into_record(self) -> AppResult<SessionRecord> {
        Ok(SessionRecord::new(
            Identity::new(self.identity)?,
            self.occurred_at.parse()?,
            self.source_address,
            Place::new(self.place),
        ))
    }

    fn to_json(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|error| {
            AppError::Internal(format!("failed to encode session record: {error}"))
        })
    }

    fn from_json(member: &str) -> AppResult<Self> {
        serde_json::from_str(member).map_err(|error| {
            AppError::Internal(format!("failed to decode stored session record: {error}"))
        })
    }
}
