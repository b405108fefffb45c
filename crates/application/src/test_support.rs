//! Hand-written port fakes shared by the service test suites.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use geosession_core::{AppError, AppResult};
use geosession_domain::{Identity, SessionRecord, SessionTimestamp, SortDirection};

use crate::{LocationLookup, LocationLookupResponse, SessionClock, SessionStorage};

/// Storage operations that can be made to fail or hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Put,
    Count,
    Query,
    Delete,
}

#[derive(Default)]
pub struct FakeStorage {
    partitions: Mutex<HashMap<Identity, BTreeMap<SessionTimestamp, SessionRecord>>>,
    failures: Mutex<HashMap<StorageOp, usize>>,
    hang: Mutex<Option<StorageOp>>,
    max_partition_size: AtomicUsize,
    interleave: AtomicBool,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yields to the scheduler before every operation so concurrent appends interleave.
    pub fn interleaving() -> Self {
        let storage = Self::default();
        storage.interleave.store(true, Ordering::SeqCst);
        storage
    }

    pub fn fail_next(&self, op: StorageOp, times: usize) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(op, times);
        }
    }

    pub fn hang_on(&self, op: StorageOp) {
        if let Ok(mut hang) = self.hang.lock() {
            *hang = Some(op);
        }
    }

    pub fn timestamps(&self, identity: &Identity) -> Vec<i64> {
        self.partitions
            .lock()
            .ok()
            .and_then(|partitions| {
                partitions.get(identity).map(|partition| {
                    partition
                        .keys()
                        .map(SessionTimestamp::as_unix_micros)
                        .collect()
                })
            })
            .unwrap_or_default()
    }

    pub fn records(&self, identity: &Identity) -> Vec<SessionRecord> {
        self.partitions
            .lock()
            .ok()
            .and_then(|partitions| {
                partitions
                    .get(identity)
                    .map(|partition| partition.values().cloned().collect())
            })
            .unwrap_or_default()
    }

    pub fn max_partition_size(&self) -> usize {
        self.max_partition_size.load(Ordering::SeqCst)
    }

    async fn enter(&self, op: StorageOp) -> AppResult<()> {
        if self.interleave.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        let hang = self.hang.lock().ok().and_then(|hang| *hang);
        if hang == Some(op) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let mut failures = self
            .failures
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock fake state: {error}")))?;
        if let Some(remaining) = failures.get_mut(&op)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(AppError::Unavailable(format!("injected {op:?} failure")));
        }

        Ok(())
    }

    fn partitions(
        &self,
    ) -> AppResult<std::sync::MutexGuard<'_, HashMap<Identity, BTreeMap<SessionTimestamp, SessionRecord>>>>
    {
        self.partitions
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock fake state: {error}")))
    }
}

#[async_trait]
impl SessionStorage for FakeStorage {
    async fn put_record(&self, record: &SessionRecord) -> AppResult<()> {
        self.enter(StorageOp::Put).await?;
        let mut partitions = self.partitions()?;
        let partition = partitions.entry(record.identity().clone()).or_default();
        partition.insert(record.occurred_at(), record.clone());
        self.max_partition_size
            .fetch_max(partition.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn count_records(&self, identity: &Identity) -> AppResult<u64> {
        self.enter(StorageOp::Count).await?;
        let partitions = self.partitions()?;
        Ok(partitions
            .get(identity)
            .map_or(0, |partition| partition.len() as u64))
    }

    async fn query_records(
        &self,
        identity: &Identity,
        direction: SortDirection,
        limit: usize,
    ) -> AppResult<Vec<SessionRecord>> {
        self.enter(StorageOp::Query).await?;
        let partitions = self.partitions()?;
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
        self.enter(StorageOp::Delete).await?;
        let mut partitions = self.partitions()?;
        if let Some(partition) = partitions.get_mut(identity) {
            partition.remove(&occurred_at);
        }
        Ok(())
    }
}

/// One scripted answer of [`ScriptedLookup`].
#[derive(Debug, Clone)]
pub enum LookupStep {
    Respond(LocationLookupResponse),
    TransportError,
    Hang,
}

/// Lookup fake replaying a script; the last step repeats once the script runs out.
pub struct ScriptedLookup {
    steps: Mutex<VecDeque<LookupStep>>,
    last: Mutex<LookupStep>,
    attempts: AtomicUsize,
}

impl ScriptedLookup {
    pub fn new(steps: Vec<LookupStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(LookupStep::TransportError),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn always(step: LookupStep) -> Self {
        Self::new(vec![step])
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> AppResult<LookupStep> {
        let mut steps = self
            .steps
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock script: {error}")))?;
        let mut last = self
            .last
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock script: {error}")))?;

        if let Some(step) = steps.pop_front() {
            *last = step.clone();
            return Ok(step);
        }

        Ok(last.clone())
    }
}

#[async_trait]
impl LocationLookup for ScriptedLookup {
    async fn lookup(&self, _address: &str) -> AppResult<LocationLookupResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.next_step()? {
            LookupStep::Respond(response) => Ok(response),
            LookupStep::TransportError => {
                Err(AppError::Unavailable("connection refused".to_owned()))
            }
            LookupStep::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AppError::Unavailable("unreachable".to_owned()))
            }
        }
    }
}

/// Clock issuing whole seconds 1, 2, 3, ...
#[derive(Default)]
pub struct StepClock {
    ticks: AtomicI64,
}

impl SessionClock for StepClock {
    fn now(&self) -> SessionTimestamp {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        at_second(tick)
    }
}

pub fn at_second(second: i64) -> SessionTimestamp {
    SessionTimestamp::from_unix_micros(second * 1_000_000)
        .unwrap_or_else(|_| panic!("second {second} out of range"))
}

pub fn seconds(values: &[i64]) -> Vec<i64> {
    values.iter().map(|second| second * 1_000_000).collect()
}
