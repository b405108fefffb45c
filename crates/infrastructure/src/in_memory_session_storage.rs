use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use geosession_application::SessionStorage;
use geosession_core::{AppError, AppResult};
use geosession_domain::{Identity, SessionRecord, SessionTimestamp, SortDirection};

type Partition = BTreeMap<SessionTimestamp, SessionRecord>;

/// Process-local session storage, ordered by sort key within each identity.
#[derive(Default)]
pub struct InMemorySessionStorage {
    partitions: RwLock<HashMap<Identity, Partition>>,
}

impl InMemorySessionStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn put_record(&self, record: &SessionRecord) -> AppResult<()> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(record.identity().clone()).or_default();

        match partition.entry(record.occurred_at()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "session '{}' already exists for identity '{}'",
                record.occurred_at(),
                record.identity()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn count_records(&self, identity: &Identity) -> AppResult<u64> {
        let partitions = self.partitions.read().await;
        let count = partitions.get(identity).map_or(0, BTreeMap::len);
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn query_records(
        &self,
        identity: &Identity,
        direction: SortDirection,
        limit: usize,
    ) -> AppResult<Vec<SessionRecord>> {
        let partitions = self.partitions.read().await;
        let Some(partition) = partitions.get(identity) else {
            return Ok(Vec::new());
        };

        let records = match direction {
            SortDirection::Ascending => partition.values().take(limit).cloned().collect(),
            SortDirection::Descending => partition.values().rev().take(limit).cloned().collect(),
        };
        Ok(records)
    }

    async fn delete_record(
        &self,
        identity: &Identity,
        occurred_at: SessionTimestamp,
    ) -> AppResult<()> {
        let mut partitions = self.partitions.write().await;
        if let Some(partition) = partitions.get_mut(identity) {
            partition.remove(&occurred_at);
            if partition.is_empty() {
                partitions.remove(identity);
            }
        }
        Ok(())
    }
}
