use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use geosession_application::{LocationLookup, LocationLookupResponse};
use geosession_core::{AppError, AppResult};

const LOOKUP_FIELDS: &str = "status,message,city";

/// Client of an ip-api compatible location service.
#[derive(Clone)]
pub struct HttpLocationLookup {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpLocationLookup {
    /// Creates a lookup against the service rooted at `base_url`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    fn lookup_url(&self, address: &str) -> AppResult<Url> {
        let address = address.trim();
        if matches!(address, "" | "." | "..") {
            return Err(AppError::Validation(format!(
                "'{address}' cannot be looked up as a network address"
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "location service url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("json")
            .push(address);
        url.query_pairs_mut()
            .clear()
            .append_pair("fields", LOOKUP_FIELDS);

        Ok(url)
    }
}

#[async_trait]
impl LocationLookup for HttpLocationLookup {
    async fn lookup(&self, address: &str) -> AppResult<LocationLookupResponse> {
        let url = self.lookup_url(address)?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("location request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Unavailable(format!(
                "location service returned HTTP {status}"
            )));
        }

        let payload = response.json::<IpApiPayload>().await.map_err(|error| {
            AppError::Unavailable(format!("location response could not be decoded: {error}"))
        })?;

        debug!(address, status = payload.status.as_str(), "location service answered");
        Ok(payload.into_response())
    }
}

#[derive(Debug, Deserialize)]
struct IpApiPayload {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl IpApiPayload {
    fn into_response(self) -> LocationLookupResponse {
        if self.status.eq_ignore_ascii_case("success") {
            LocationLookupResponse::success(self.city)
        } else {
            LocationLookupResponse::failed(self.message)
        }
    }
}
