use geosession_application::SessionRecorder;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub session_recorder: SessionRecorder,
    pub storage_backend: &'static str,
}
