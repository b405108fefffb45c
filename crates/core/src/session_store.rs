use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppError;

/// Stable discriminator for [`SessionStoreError`], suitable for transport payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStoreErrorKind {
    /// The new record was not written.
    InsertFailed,
    /// The record was written but the partition could not be counted.
    CountFailed,
    /// The partition could not be queried for eviction candidates.
    LookupOldestFailed,
    /// An eviction candidate could not be deleted.
    EvictFailed,
    /// Any failure outside the four storage steps.
    SaveProcessFailed,
}

impl SessionStoreErrorKind {
    /// Returns a stable transport value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertFailed => "insert_failed",
            Self::CountFailed => "count_failed",
            Self::LookupOldestFailed => "lookup_oldest_failed",
            Self::EvictFailed => "evict_failed",
            Self::SaveProcessFailed => "save_process_failed",
        }
    }
}

impl Display for SessionStoreErrorKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Failure of one `append` against the session history store.
///
/// Only [`SessionStoreError::InsertFailed`] means nothing was written. Every
/// other variant leaves the new record persisted; the retention cap catches
/// up on a later append for the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStoreError {
    /// Storage rejected or timed out the write.
    #[error("failed to insert session record: {0}")]
    InsertFailed(String),

    /// Storage failed to count the partition after the insert.
    #[error("failed to count session records: {0}")]
    CountFailed(String),

    /// Storage failed to return the oldest records of the partition.
    #[error("failed to look up oldest session records: {0}")]
    LookupOldestFailed(String),

    /// Storage failed to delete an eviction candidate.
    #[error("failed to evict oldest session record: {0}")]
    EvictFailed(String),

    /// Unclassified failure of the save process.
    #[error("session save process failed: {0}")]
    SaveProcessFailed(String),
}

impl SessionStoreError {
    /// Returns the fieldless kind of this error.
    #[must_use]
    pub fn kind(&self) -> SessionStoreErrorKind {
        match self {
            Self::InsertFailed(_) => SessionStoreErrorKind::InsertFailed,
            Self::CountFailed(_) => SessionStoreErrorKind::CountFailed,
            Self::LookupOldestFailed(_) => SessionStoreErrorKind::LookupOldestFailed,
            Self::EvictFailed(_) => SessionStoreErrorKind::EvictFailed,
            Self::SaveProcessFailed(_) => SessionStoreErrorKind::SaveProcessFailed,
        }
    }

    /// Returns `true` when the new record is known to be persisted.
    #[must_use]
    pub fn record_persisted(&self) -> bool {
        matches!(
            self,
            Self::CountFailed(_) | Self::LookupOldestFailed(_) | Self::EvictFailed(_)
        )
    }
}

impl From<SessionStoreError> for AppError {
    fn from(value: SessionStoreError) -> Self {
        AppError::Unavailable(value.to_string())
    }
}
