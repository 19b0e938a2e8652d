//! # Response Types
//!
//! Fixed-shape JSON bodies returned by the Cert API.

use serde::Deserialize;
use zeroize::Zeroizing;

/// Body of `POST {apiEndpoint}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateCertificateResponse {
    #[serde(rename = "taskId")]
    pub guid: String,
}

/// Body of `GET {apiEndpoint}{guid}`
///
/// Timestamps are kept as the raw `YYYY-MM-DDTHH:MM:SS` strings; the
/// reconciler parses them so each field can fail with its own reason.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateValidity {
    #[serde(default)]
    pub valid_to: String,
    #[serde(default)]
    pub valid_from: String,
    #[serde(default)]
    pub signature_hash_algorithm: String,
}

/// Body of `GET {apiEndpoint}{guid}{downloadEndpoint}{form}`
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CertificateArchive {
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub format: String,
    /// Base64 encoded PKCS#12 archive
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for CertificateArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateArchive")
            .field("form", &self.form)
            .field("format", &self.format)
            .field("data_len", &self.data.len())
            .finish_non_exhaustive()
    }
}
