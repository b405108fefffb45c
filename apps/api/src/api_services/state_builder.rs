use std::sync::Arc;

use geosession_application::{
    LocationResolver, MonotonicSessionClock, SessionHistoryStore, SessionRecorder, SessionStorage,
};
use geosession_core::AppError;
use geosession_infrastructure::{AesIdentityDecryptor, HttpLocationLookup, InMemorySessionStorage};
use tracing::info;

use super::{build_postgres_storage, build_redis_storage};
use crate::api_config::{ApiConfig, StorageBackendConfig};
use crate::state::AppState;

pub async fn build_app_state(config: &ApiConfig) -> Result<AppState, AppError> {
    let storage = build_session_storage(&config.storage).await?;

    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;
    let lookup = Arc::new(HttpLocationLookup::new(
        http_client,
        config.location_base_url.clone(),
    ));

    let mut session_recorder = SessionRecorder::new(
        LocationResolver::new(lookup, config.resolver),
        SessionHistoryStore::new(storage, config.history),
        Arc::new(MonotonicSessionClock::new()),
    );

    if let Some(identity_key) = config.identity_key.as_deref() {
        let decryptor = AesIdentityDecryptor::from_base64_key(identity_key)?;
        session_recorder = session_recorder.with_identity_decryptor(Arc::new(decryptor));
        info!("encrypted identity submission enabled");
    }

    Ok(AppState {
        session_recorder,
        storage_backend: config.storage.backend_name(),
    })
}

async fn build_session_storage(
    storage: &StorageBackendConfig,
) -> Result<Arc<dyn SessionStorage>, AppError> {
    match storage {
        StorageBackendConfig::Memory => {
            info!(backend = "memory", "session storage configured");
            Ok(Arc::new(InMemorySessionStorage::new()))
        }
        StorageBackendConfig::Postgres {
            database_url,
            table_name,
        } => {
            let storage = build_postgres_storage(database_url, table_name).await?;
            Ok(Arc::new(storage))
        }
        StorageBackendConfig::Redis {
            redis_url,
            key_prefix,
        } => {
            let storage = build_redis_storage(redis_url, key_prefix)?;
            Ok(Arc::new(storage))
        }
    }
}
