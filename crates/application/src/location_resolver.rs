//! Best-effort location enrichment with a bounded attempt budget.
//!
//! Transport errors, timeouts and structured "lookup failed" answers each
//! consume one attempt. The first success short-circuits; exhausting the
//! budget yields [`Place::not_available`]. Resolution never fails outward.
//!
//! Dropping the future returned by [`LocationResolver::resolve`] cancels the
//! in-flight attempt and any pending backoff.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use geosession_domain::Place;

use crate::session_ports::{LocationLookup, LookupStatus};


/// Retry policy of the location resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationResolverConfig {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u8,
    /// Upper bound for a single lookup call.
    pub attempt_timeout: Duration,
    /// Backoff unit; the delay after attempt `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl Default for LocationResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            attempt_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Resolves client network addresses to place names.
#[derive(Clone)]
pub struct LocationResolver {
    lookup: Arc<dyn LocationLookup>,
    config: LocationResolverConfig,
}

impl LocationResolver {
    /// Creates a resolver over a lookup implementation.
    #[must_use]
    pub fn new(lookup: Arc<dyn LocationLookup>, config: LocationResolverConfig) -> Self {
        Self {
            lookup,
            config: LocationResolverConfig {
                max_attempts: config.max_attempts.max(1),
                ..config
            },
        }
    }

    /// Returns the effective retry policy.
    #[must_use]
    pub fn config(&self) -> LocationResolverConfig {
        self.config
    }

    /// Resolves an address, falling back to the sentinel place.
    pub async fn resolve(&self, address: &str) -> Place {
        let max_attempts = self.config.max_attempts;
        let mut attempt = 0_u8;

        while attempt < max_attempts {
            attempt = attempt.saturating_add(1);
            debug!(address, attempt, max_attempts, "resolving location");

            let outcome =
                tokio::time::timeout(self.config.attempt_timeout, self.lookup.lookup(address))
                    .await;

            match outcome {
                Ok(Ok(response)) if response.status == LookupStatus::Success => {
                    let place = response
                        .place
                        .map(Place::new)
                        .unwrap_or_else(Place::not_available);
                    debug!(address, attempt, place = %place, "location resolved");
                    return place;
                }
                Ok(Ok(response)) => {
                    warn!(
                        address,
                        attempt,
                        message = response.message.as_deref().unwrap_or("unknown error"),
                        "location service could not resolve address"
                    );
                }
                Ok(Err(error)) => {
                    warn!(address, attempt, error = %error, "location lookup attempt failed");
                }
                Err(_) => {
                    let timeout_ms =
                        u64::try_from(self.config.attempt_timeout.as_millis()).unwrap_or(u64::MAX);
                    warn!(address, attempt, timeout_ms, "location lookup attempt timed out");
                }
            }

            if attempt < max_attempts && !self.config.retry_backoff.is_zero() {
                let delay = self
                    .config
                    .retry_backoff
                    .saturating_mul(u32::from(attempt));
                tokio::time::sleep(delay).await;
            }
        }

        warn!(address, max_attempts, "location lookup attempts exhausted");
        Place::not_available()
    }
}
