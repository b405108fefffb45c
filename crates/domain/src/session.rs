//! Session history records and their sort key.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use geosession_core::{AppError, AppResult};

use crate::Identity;

/// Placeholder stored when no usable location could be resolved.
pub const PLACE_NOT_AVAILABLE: &str = "city not available";

/// Sort key of a session record within its identity partition.
///
/// Always carries microsecond precision. The string form is RFC 3339 UTC with
/// six fractional digits, so lexicographic order equals chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionTimestamp(DateTime<Utc>);

impl SessionTimestamp {
    /// Creates a timestamp, truncating anything below one microsecond.
    #[must_use]
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        let micros = value.timestamp_micros();
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(value))
    }

    /// Creates a timestamp from microseconds since the Unix epoch.
    pub fn from_unix_micros(micros: i64) -> AppResult<Self> {
        DateTime::from_timestamp_micros(micros)
            .map(Self)
            .ok_or_else(|| {
                AppError::Validation(format!("session timestamp {micros} is out of range"))
            })
    }

    /// Returns microseconds since the Unix epoch.
    #[must_use]
    pub fn as_unix_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// Returns the wrapped UTC date-time.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns the sortable string form.
    #[must_use]
    pub fn to_sortable_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl Display for SessionTimestamp {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.to_sortable_string().as_str())
    }
}

impl FromStr for SessionTimestamp {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| Self::from_datetime(parsed.with_timezone(&Utc)))
            .map_err(|error| {
                AppError::Validation(format!("invalid session timestamp '{value}': {error}"))
            })
    }
}

/// Resolved location name of a session, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Place(String);

impl Place {
    /// Creates a place, substituting the fallback sentinel for blank input.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Self::not_available();
        }

        Self(trimmed.to_owned())
    }

    /// Returns the fallback sentinel.
    #[must_use]
    pub fn not_available() -> Self {
        Self(PLACE_NOT_AVAILABLE.to_owned())
    }

    /// Returns `true` when this is the fallback sentinel.
    #[must_use]
    pub fn is_not_available(&self) -> bool {
        self.0 == PLACE_NOT_AVAILABLE
    }

    /// Returns the place name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Place {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// One authentication event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    identity: Identity,
    occurred_at: SessionTimestamp,
    source_address: String,
    place: Place,
}

impl SessionRecord {
    /// Creates a session record.
    #[must_use]
    pub fn new(
        identity: Identity,
        occurred_at: SessionTimestamp,
        source_address: impl Into<String>,
        place: Place,
    ) -> Self {
        Self {
            identity,
            occurred_at,
            source_address: source_address.into(),
            place,
        }
    }

    /// Returns the partition key.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the sort key.
    #[must_use]
    pub fn occurred_at(&self) -> SessionTimestamp {
        self.occurred_at
    }

    /// Returns the client network address, stored verbatim.
    #[must_use]
    pub fn source_address(&self) -> &str {
        self.source_address.as_str()
    }

    /// Returns the resolved place or the fallback sentinel.
    #[must_use]
    pub fn place(&self) -> &Place {
        &self.place
    }
}

/// Order in which a partition is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}
