//! # Cert API Credentials
//!
//! Parsed from the Secret a CertificateConfig references. Read on every
//! reconcile so a rotated token takes effect immediately.

use crate::constants::CREDENTIALS_KEY;
use k8s_openapi::ByteString;
use serde::Deserialize;
use std::collections::BTreeMap;
use zeroize::Zeroizing;

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("cannot unmarshal credentials as JSON: {0}")]
    Unmarshal(#[source] serde_json::Error),
    #[error("missing API Endpoint in secret")]
    MissingApiEndpoint,
    #[error("missing Download API Endpoint in secret")]
    MissingDownloadEndpoint,
    #[error("missing token in secret")]
    MissingToken,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
    #[serde(default)]
    api_endpoint: Option<String>,
    #[serde(default)]
    download_endpoint: Option<String>,
    #[serde(default)]
    token: Option<Zeroizing<String>>,
}

/// Endpoint and bearer token for the Cert API
#[derive(Clone)]
pub struct Credentials {
    pub api_endpoint: String,
    pub download_endpoint: String,
    pub token: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_endpoint", &self.api_endpoint)
            .field("download_endpoint", &self.download_endpoint)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Parse the `credentials` key of a Secret's data.
    ///
    /// All three fields are required and are checked in a fixed order:
    /// API endpoint, download endpoint, token.
    pub fn from_secret_data(
        data: Option<&BTreeMap<String, ByteString>>,
    ) -> Result<Self, CredentialsError> {
        let raw = data
            .and_then(|d| d.get(CREDENTIALS_KEY))
            .map(|v| v.0.as_slice())
            .unwrap_or_default();
        Self::from_json(raw)
    }

    pub fn from_json(raw: &[u8]) -> Result<Self, CredentialsError> {
        let parsed: RawCredentials =
            serde_json::from_slice(raw).map_err(CredentialsError::Unmarshal)?;

        let api_endpoint = parsed
            .api_endpoint
            .filter(|v| !v.is_empty())
            .ok_or(CredentialsError::MissingApiEndpoint)?;
        let download_endpoint = parsed
            .download_endpoint
            .filter(|v| !v.is_empty())
            .ok_or(CredentialsError::MissingDownloadEndpoint)?;
        let token = parsed
            .token
            .filter(|v| !v.is_empty())
            .ok_or(CredentialsError::MissingToken)?;

        Ok(Self {
            api_endpoint,
            download_endpoint,
            token,
        })
    }
}
