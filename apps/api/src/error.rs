use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geosession_core::{AppError, SessionStoreError};
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    pub message: String,
    /// Store failure kind, present only for history store failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub kind: Option<String>,
}

/// HTTP API error wrapper around application and store errors.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    Store(SessionStoreError),
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<SessionStoreError> for ApiError {
    fn from(value: SessionStoreError) -> Self {
        Self::Store(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::App(AppError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::App(AppError::Conflict(_)) => StatusCode::CONFLICT,
            Self::App(AppError::Unavailable(_)) | Self::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::App(AppError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn payload(&self) -> ErrorResponse {
        match self {
            Self::App(AppError::Validation(message)) => ErrorResponse {
                message: message.clone(),
                kind: None,
            },
            Self::App(other) => ErrorResponse {
                message: other.to_string(),
                kind: None,
            },
            Self::Store(store_error) => ErrorResponse {
                message: "session history is temporarily unavailable".to_owned(),
                kind: Some(store_error.kind().as_str().to_owned()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Store(store_error) => {
                error!(
                    kind = %store_error.kind(),
                    record_persisted = store_error.record_persisted(),
                    error = %store_error,
                    "session store failure"
                );
            }
            Self::App(app_error) if status.is_server_error() => {
                error!(error = %app_error, "request failed");
            }
            Self::App(_) => {}
        }

        (status, Json(self.payload())).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
