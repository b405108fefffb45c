//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod aes_identity_decryptor;
mod http_location_lookup;
mod in_memory_session_storage;
mod postgres_session_storage;
mod redis_session_storage;

pub use aes_identity_decryptor::AesIdentityDecryptor;
pub use http_location_lookup::HttpLocationLookup;
pub use in_memory_session_storage::InMemorySessionStorage;
pub use postgres_session_storage::{DEFAULT_SESSION_TABLE, PostgresSessionStorage};
pub use redis_session_storage::RedisSessionStorage;
