use std::net::IpAddr;

use axum::Json;
use axum::extract::State;
use geosession_application::SessionRecorder;
use geosession_core::AppError;
use geosession_domain::{EmailAddress, Identity};

use crate::dto::{RecordSessionRequest, SessionRecordedResponse};
use crate::error::ApiResult;
use crate::state::AppState;


pub async fn record_session_handler(
    State(state): State<AppState>,
    Json(payload): Json<RecordSessionRequest>,
) -> ApiResult<Json<SessionRecordedResponse>> {
    let (identity, address) = validate_request(&state.session_recorder, &payload)?;

    let summary = state
        .session_recorder
        .record(&identity, address.to_string().as_str())
        .await?;

    Ok(Json(SessionRecordedResponse::from(summary)))
}

fn validate_request(
    recorder: &SessionRecorder,
    payload: &RecordSessionRequest,
) -> Result<(Identity, IpAddr), AppError> {
    let mut problems = Vec::new();

    let identity = if payload.email.trim().is_empty() {
        problems.push("email: email is required".to_owned());
        None
    } else {
        match recorder
            .open_identity(payload.email.as_str())
            .and_then(EmailAddress::new)
        {
            Ok(email) => Some(Identity::from(email)),
            Err(error) => {
                problems.push(format!("email: {}", validation_detail(error)));
                None
            }
        }
    };

    let address = if payload.ip.trim().is_empty() {
        problems.push("ip: ip is required".to_owned());
        None
    } else {
        match payload.ip.trim().parse::<IpAddr>() {
            Ok(address) => Some(address),
            Err(_) => {
                problems.push("ip: must be an IPv4 or IPv6 address".to_owned());
                None
            }
        }
    };

    match (identity, address) {
        (Some(identity), Some(address)) if problems.is_empty() => Ok((identity, address)),
        _ => Err(AppError::Validation(problems.join("; "))),
    }
}

fn validation_detail(error: AppError) -> String {
    match error {
        AppError::Validation(message) => message,
        other => other.to_string(),
    }
}
