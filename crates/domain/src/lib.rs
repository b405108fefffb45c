//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod identity;
mod session;

pub use identity::{EmailAddress, Identity};
pub use session::{PLACE_NOT_AVAILABLE, Place, SessionRecord, SessionTimestamp, SortDirection};
