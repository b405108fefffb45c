//! Bounded per-identity session history.
//!
//! Every append runs insert, count and evict in that order against the
//! storage port. When the count exceeds the cap, the partition is read
//! newest-first and everything past the newest `cap` records is deleted,
//! oldest first. Without faults or races that is exactly the single oldest
//! record; after a failed eviction or racing appends it removes the whole
//! excess, so the partition converges back to the cap on the next append.
//!
//! No step is retried here. A failure stops the sequence and is reported with
//! the kind of the step that failed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use geosession_core::{AppResult, SessionStoreError};
use geosession_domain::{Identity, SessionRecord, SortDirection};

use crate::session_ports::SessionStorage;


/// How appends for the same identity relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendConcurrency {
    /// No lock. Racing appends may overshoot the cap transiently and converge
    /// once writers settle.
    #[default]
    Concurrent,
    /// Appends for one identity run one at a time within this process.
    SerializedPerIdentity,
}

/// Retention and timeout settings of the session history store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHistoryConfig {
    /// Maximum records kept per identity. Zero is treated as one.
    pub cap: usize,
    /// Upper bound for each storage operation.
    pub operation_timeout: Duration,
    /// Same-identity write coordination.
    pub concurrency: AppendConcurrency,
}

impl Default for SessionHistoryConfig {
    fn default() -> Self {
        Self {
            cap: 5,
            operation_timeout: Duration::from_secs(5),
            concurrency: AppendConcurrency::Concurrent,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StoreStep {
    Insert,
    Count,
    LookupOldest,
    Evict,
}

impl StoreStep {
    fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Count => "count",
            Self::LookupOldest => "lookup_oldest",
            Self::Evict => "evict",
        }
    }

    fn error(self, detail: String) -> SessionStoreError {
        match self {
            Self::Insert => SessionStoreError::InsertFailed(detail),
            Self::Count => SessionStoreError::CountFailed(detail),
            Self::LookupOldest => SessionStoreError::LookupOldestFailed(detail),
            Self::Evict => SessionStoreError::EvictFailed(detail),
        }
    }
}

/// Persists session records and enforces the per-identity retention cap.
#[derive(Clone)]
pub struct SessionHistoryStore {
    storage: Arc<dyn SessionStorage>,
    config: SessionHistoryConfig,
    locks: Arc<PartitionLocks>,
}

impl SessionHistoryStore {
    /// Creates a store over a storage implementation.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>, config: SessionHistoryConfig) -> Self {
        Self {
            storage,
            config: SessionHistoryConfig {
                cap: config.cap.max(1),
                ..config
            },
            locks: Arc::new(PartitionLocks::default()),
        }
    }

    /// Returns the effective retention cap.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.config.cap
    }

    /// Appends a record to the identity's history and trims it to the cap.
    pub async fn append(
        &self,
        identity: &Identity,
        record: SessionRecord,
    ) -> Result<(), SessionStoreError> {
        if record.identity() != identity {
            let error = SessionStoreError::SaveProcessFailed(format!(
                "record identity '{}' does not match partition '{identity}'",
                record.identity()
            ));
            warn!(identity = %identity, kind = %error.kind(), "rejected session append");
            return Err(error);
        }

        match self.config.concurrency {
            AppendConcurrency::Concurrent => self.append_sequence(identity, &record).await,
            AppendConcurrency::SerializedPerIdentity => {
                let handle = self.locks.handle(identity)?;
                let locked =
                    tokio::time::timeout(self.config.operation_timeout, handle.lock_owned()).await;
                let Ok(_guard) = locked else {
                    let error = SessionStoreError::SaveProcessFailed(format!(
                        "timed out waiting for the partition lock of '{identity}'"
                    ));
                    warn!(identity = %identity, kind = %error.kind(), "session append failed");
                    return Err(error);
                };

                self.append_sequence(identity, &record).await
            }
        }
    }

    async fn append_sequence(
        &self,
        identity: &Identity,
        record: &SessionRecord,
    ) -> Result<(), SessionStoreError> {
        self.run(identity, StoreStep::Insert, self.storage.put_record(record))
            .await?;

        let count = self
            .run(identity, StoreStep::Count, self.storage.count_records(identity))
            .await?;
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let cap = self.config.cap;

        if count <= cap {
            debug!(identity = %identity, count, cap, "session appended within cap");
            return Ok(());
        }

        let newest_first = self
            .run(
                identity,
                StoreStep::LookupOldest,
                self.storage
                    .query_records(identity, SortDirection::Descending, count),
            )
            .await?;

        let mut evicted = 0_usize;
        for stale in newest_first.iter().skip(cap).rev() {
            self.run(
                identity,
                StoreStep::Evict,
                self.storage.delete_record(identity, stale.occurred_at()),
            )
            .await?;
            evicted += 1;
            debug!(
                identity = %identity,
                occurred_at = %stale.occurred_at(),
                "evicted session record"
            );
        }

        debug!(identity = %identity, count, cap, evicted, "session appended with eviction");
        Ok(())
    }

    async fn run<T, F>(
        &self,
        identity: &Identity,
        step: StoreStep,
        operation: F,
    ) -> Result<T, SessionStoreError>
    where
        F: Future<Output = AppResult<T>>,
    {
        let error = match tokio::time::timeout(self.config.operation_timeout, operation).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => step.error(error.to_string()),
            Err(_) => step.error(format!(
                "{} timed out after {} ms",
                step.as_str(),
                self.config.operation_timeout.as_millis()
            )),
        };

        warn!(
            identity = %identity,
            step = step.as_str(),
            kind = %error.kind(),
            error = %error,
            "session append failed"
        );
        Err(error)
    }
}

/// Async mutexes keyed by identity, dropped once nobody holds or awaits them.
#[derive(Default)]
struct PartitionLocks {
    entries: Mutex<HashMap<Identity, Weak<tokio::sync::Mutex<()>>>>,
}

impl PartitionLocks {
    fn handle(
        &self,
        identity: &Identity,
    ) -> Result<Arc<tokio::sync::Mutex<()>>, SessionStoreError> {
        let mut entries = self.entries.lock().map_err(|error| {
            SessionStoreError::SaveProcessFailed(format!("partition lock table poisoned: {error}"))
        })?;

        if let Some(existing) = entries.get(identity).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        entries.retain(|_, entry| entry.strong_count() > 0);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        entries.insert(identity.clone(), Arc::downgrade(&lock));
        Ok(lock)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}
