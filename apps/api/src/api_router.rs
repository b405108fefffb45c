mod cors;

use axum::Router;
use axum::routing::{get, post};
use geosession_core::AppError;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/api/sessions",
            post(handlers::sessions::record_session_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
