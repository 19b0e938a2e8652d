//! Cert API REST Client
//!
//! reqwest implementation of [`IssuanceClient`](crate::provider::IssuanceClient).
//!
//! A new `reqwest::Client` is built for every request so the TLS
//! verification toggle and timeout of the current CertificateConfig always
//! apply. Non-200 responses surface the canonical HTTP status text
//! (e.g. `Not Found`) as the error message.

mod operations;
mod requests;
mod responses;

pub use requests::*;
pub use responses::*;

use crate::provider::credentials::Credentials;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

const ACCEPT_JSON: &str = "application/json";

/// Failure of a single HTTP exchange with the Cert API
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("http request to {url:?} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed reading response body: {0}")]
    ReadBody(#[source] reqwest::Error),
    /// Canonical status text of a non-200 response
    #[error("{0}")]
    Status(String),
}

/// A 200 response whose body could not be used
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// Anything other than a JSON object
    #[error("response body is not JSON")]
    NotJson,
    #[error("{0}")]
    Unmarshal(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CertApiError {
    #[error("POST to cert failed: {0}")]
    Post(#[source] HttpError),
    #[error("GET request to Cert API failed: {0}")]
    Get(#[source] HttpError),
    #[error("download request to Cert API failed: {0}")]
    Download(#[source] HttpError),
    #[error("failed to unmarshal response body: {0}")]
    Body(#[source] BodyError),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CertApiError {
    /// HTTP status the Cert API answered with, if the exchange got that far
    #[must_use]
    pub fn status_text(&self) -> Option<&str> {
        match self {
            CertApiError::Post(HttpError::Status(s))
            | CertApiError::Get(HttpError::Status(s))
            | CertApiError::Download(HttpError::Status(s)) => Some(s),
            _ => None,
        }
    }
}

/// Cert API client
pub struct CertApiClient {
    api_endpoint: String,
    download_endpoint: String,
    token: Zeroizing<String>,
    timeout: Duration,
    skip_tls_verify: bool,
}

impl std::fmt::Debug for CertApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertApiClient")
            .field("api_endpoint", &self.api_endpoint)
            .field("download_endpoint", &self.download_endpoint)
            .field("timeout", &self.timeout)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .finish_non_exhaustive()
    }
}

impl CertApiClient {
    #[must_use]
    pub fn new(credentials: Credentials, timeout: Duration, skip_tls_verify: bool) -> Self {
        Self {
            api_endpoint: credentials.api_endpoint,
            download_endpoint: credentials.download_endpoint,
            token: credentials.token,
            timeout,
            skip_tls_verify,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `{apiEndpoint}`
    pub(crate) fn create_url(&self) -> String {
        self.api_endpoint.clone()
    }

    /// `{apiEndpoint}{guid}`
    pub(crate) fn validity_url(&self, guid: &str) -> String {
        format!("{}{guid}", self.api_endpoint)
    }

    /// `{apiEndpoint}{guid}{downloadEndpoint}{form}`
    pub(crate) fn download_url(&self, guid: &str, form: &str) -> String {
        format!("{}{guid}{}{form}", self.api_endpoint, self.download_endpoint)
    }

    /// Send one request and return the body of a 200 response
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, HttpError> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.skip_tls_verify)
            .timeout(self.timeout)
            .build()
            .map_err(HttpError::Client)?;

        let mut request = http_client
            .request(method.clone(), url)
            .bearer_auth(self.token.as_str())
            .header(reqwest::header::ACCEPT, ACCEPT_JSON);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(method = %method, url = %url, "http request sent");
        let response = request.send().await.map_err(|source| HttpError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(HttpError::ReadBody)?;

        if status != StatusCode::OK {
            info!(
                method = %method,
                url = %url,
                status_code = status.as_u16(),
                "request failed"
            );
            return Err(HttpError::Status(status_text(status)));
        }

        Ok(text)
    }
}

/// Canonical reason phrase, or the bare code for unregistered statuses
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_string(), str::to_string)
}

/// Parse a response body, reporting a non-object body separately from a shape mismatch
pub(crate) fn parse_response_body<T: DeserializeOwned>(body: &str) -> Result<T, BodyError> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(body).map_err(|_| BodyError::NotJson)?;
    serde_json::from_value(serde_json::Value::Object(object)).map_err(BodyError::Unmarshal)
}
