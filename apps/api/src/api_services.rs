mod database;
mod redis;
mod state_builder;

pub use database::{build_postgres_storage, connect_and_migrate};
pub use redis::build_redis_storage;
pub use state_builder::build_app_state;
