//! Ports consumed by the session history services.

use async_trait::async_trait;

use geosession_core::AppResult;
use geosession_domain::{Identity, SessionRecord, SessionTimestamp, SortDirection};

/// Keyed storage engine holding session records partitioned by identity.
///
/// Implementations must be safe for concurrent use by multiple callers.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Writes one record under its identity and sort key.
    async fn put_record(&self, record: &SessionRecord) -> AppResult<()>;

    /// Counts the records stored under an identity.
    async fn count_records(&self, identity: &Identity) -> AppResult<u64>;

    /// Returns up to `limit` records of an identity in the requested order.
    async fn query_records(
        &self,
        identity: &Identity,
        direction: SortDirection,
        limit: usize,
    ) -> AppResult<Vec<SessionRecord>>;

    /// Deletes one record by its full key.
    ///
    /// Deleting a key that does not exist must succeed without effect.
    async fn delete_record(
        &self,
        identity: &Identity,
        occurred_at: SessionTimestamp,
    ) -> AppResult<()>;
}

/// Outcome reported by the location service for one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    /// The service resolved the address.
    Success,
    /// The service answered but could not resolve the address.
    Failed,
}

/// Structured location service answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationLookupResponse {
    /// Status indicator.
    pub status: LookupStatus,
    /// Place name, if the service returned one.
    pub place: Option<String>,
    /// Diagnostic message, if the service returned one.
    pub message: Option<String>,
}

impl LocationLookupResponse {
    /// Builds a successful response.
    #[must_use]
    pub fn success(place: Option<String>) -> Self {
        Self {
            status: LookupStatus::Success,
            place,
            message: None,
        }
    }

    /// Builds a failed response.
    #[must_use]
    pub fn failed(message: Option<String>) -> Self {
        Self {
            status: LookupStatus::Failed,
            place: None,
            message,
        }
    }
}

/// Location service keyed by client network address.
///
/// An `Err` is a transport failure (connection, timeout, undecodable body).
#[async_trait]
pub trait LocationLookup: Send + Sync {
    /// Looks up one network address.
    async fn lookup(&self, address: &str) -> AppResult<LocationLookupResponse>;
}

/// Port for opening identities that clients submit encrypted.
pub trait IdentityDecryptor: Send + Sync {
    /// Decrypts a transport-encoded identity into its plaintext form.
    fn decrypt(&self, encoded: &str) -> AppResult<String>;
}
