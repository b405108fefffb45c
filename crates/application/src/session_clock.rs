use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use geosession_domain::SessionTimestamp;

/// Source of session sort keys.
pub trait SessionClock: Send + Sync {
    /// Returns the timestamp for a record created now.
    fn now(&self) -> SessionTimestamp;
}

/// Wall clock that never issues the same microsecond twice.
///
/// When two calls land on the same microsecond, or the wall clock steps
/// backwards, the issued value is bumped one microsecond past the last one.
#[derive(Debug, Default)]
pub struct MonotonicSessionClock {
    last_issued_micros: AtomicI64,
}

impl MonotonicSessionClock {
    /// Creates a clock with no issued timestamps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self, wall_micros: i64) -> i64 {
        let previous = match self.last_issued_micros.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |last| Some(wall_micros.max(last.saturating_add(1))),
        ) {
            Ok(previous) | Err(previous) => previous,
        };

        wall_micros.max(previous.saturating_add(1))
    }
}

impl SessionClock for MonotonicSessionClock {
    fn now(&self) -> SessionTimestamp {
        let wall = Utc::now();
        let issued = self.issue(wall.timestamp_micros());

        SessionTimestamp::from_unix_micros(issued)
            .unwrap_or_else(|_| SessionTimestamp::from_datetime(wall))
    }
}
