use axum::Json;
use axum::extract::State;

use crate::dto::HealthResponse;
use crate::state::AppState;

/// Liveness check; also names the storage backend this instance appends to.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage: state.storage_backend,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use geosession_application::{
        LocationResolver, LocationResolverConfig, MonotonicSessionClock, SessionHistoryConfig,
        SessionHistoryStore, SessionRecorder,
    };
    use geosession_core::{AppError, AppResult};
    use geosession_infrastructure::{HttpLocationLookup, InMemorySessionStorage};
    use url::Url;

    use super::health_handler;
    use crate::state::AppState;

    #[tokio::test]
    async fn reports_configured_storage_backend() -> AppResult<()> {
        let base_url = Url::parse("http://127.0.0.1:9")
            .map_err(|error| AppError::Internal(error.to_string()))?;
        let session_recorder = SessionRecorder::new(
            LocationResolver::new(
                Arc::new(HttpLocationLookup::new(reqwest::Client::new(), base_url)),
                LocationResolverConfig::default(),
            ),
            SessionHistoryStore::new(
                Arc::new(InMemorySessionStorage::new()),
                SessionHistoryConfig::default(),
            ),
            Arc::new(MonotonicSessionClock::new()),
        );

        let response = health_handler(State(AppState {
            session_recorder,
            storage_backend: "redis",
        }))
        .await;

        assert_eq!(response.status, "ok");
        assert_eq!(response.storage, "redis");
        Ok(())
    }
}
