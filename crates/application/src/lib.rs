//! Application services and ports.

#![forbid(unsafe_code)]

mod location_resolver;
mod session_clock;
mod session_history_store;
mod session_ports;
mod session_recorder;

#[cfg(test)]
mod test_support;

pub use location_resolver::{LocationResolver, LocationResolverConfig};
pub use session_clock::{MonotonicSessionClock, SessionClock};
pub use session_history_store::{AppendConcurrency, SessionHistoryConfig, SessionHistoryStore};
pub use session_ports::{
    IdentityDecryptor, LocationLookup, LocationLookupResponse, LookupStatus, SessionStorage,
};
pub use session_recorder::{SessionRecorder, SessionSummary};
