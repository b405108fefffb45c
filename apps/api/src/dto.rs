use geosession_application::SessionSummary;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// Incoming payload for recording an authentication session.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/record-session-request.ts"
)]
pub struct RecordSessionRequest {
    /// Email address, or its encrypted form when identity decryption is enabled.
    #[serde(default)]
    pub email: String,
    /// Client IPv4 or IPv6 address.
    #[serde(default)]
    pub ip: String,
}

/// API representation of a recorded session.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/session-recorded-response.ts"
)]
pub struct SessionRecordedResponse {
    pub message: String,
    pub place: String,
    pub occurred_at: String,
}

impl From<SessionSummary> for SessionRecordedResponse {
    fn from(summary: SessionSummary) -> Self {
        Self {
            message: "session recorded".to_owned(),
            place: summary.place.as_str().to_owned(),
            occurred_at: summary.occurred_at.to_sortable_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use geosession_application::SessionSummary;
    use geosession_core::AppResult;
    use geosession_domain::{Identity, Place, SessionTimestamp};
    use ts_rs::Config;
    use ts_rs::TS;

    use super::{HealthResponse, RecordSessionRequest, SessionRecordedResponse};
    use crate::error::ErrorResponse;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        HealthResponse::export(&config)?;
        RecordSessionRequest::export(&config)?;
        SessionRecordedResponse::export(&config)?;
        ErrorResponse::export(&config)?;

        Ok(())
    }

    #[test]
    fn summary_maps_to_response() -> AppResult<()> {
        let summary = SessionSummary {
            identity: Identity::new("user@example.com")?,
            place: Place::not_available(),
            occurred_at: SessionTimestamp::from_unix_micros(1_792_397_702_000_731)?,
        };

        let response = SessionRecordedResponse::from(summary);

        assert_eq!(response.message, "session recorded");
        assert_eq!(response.place, "city not available");
        assert_eq!(response.occurred_at, "2026-10-19T08:15:02.000731Z");
        Ok(())
    }
}
