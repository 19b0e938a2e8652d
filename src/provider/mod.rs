//! # Issuance Provider
//!
//! Abstraction over the external certificate issuing service.
//!
//! - `cert_api`: REST implementation of [`IssuanceClient`]
//! - `credentials`: credentials bundle read from the referenced Secret
//!
//! Clients are never cached. [`ClientBuilder`] builds a fresh one from the
//! current CertificateConfig and Secret data on every reconcile.

pub mod cert_api;
pub mod credentials;

pub use cert_api::{
    CertApiClient, CertApiError, CertificateArchive, CertificateValidity, HttpError,
};
pub use credentials::{Credentials, CredentialsError};

use crate::controller::validation::DurationError;
use crate::crd::{CertificateConfig, CertificateData};
use async_trait::async_trait;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The three operations of the issuance protocol
#[async_trait]
pub trait IssuanceClient: Send + Sync {
    /// Request a new certificate and return the guid assigned to it
    async fn issue(&self, data: &CertificateData) -> Result<String, CertApiError>;

    /// Validity window and signature algorithm of an issued certificate
    async fn fetch_validity(&self, guid: &str) -> Result<CertificateValidity, CertApiError>;

    /// Password-protected archive of an issued certificate
    async fn download(&self, guid: &str, form: &str) -> Result<CertificateArchive, CertApiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("invalid waitTimeout: {0}")]
    WaitTimeout(#[from] DurationError),
}

/// Builds an [`IssuanceClient`] for one reconcile
pub trait ClientBuilder: Send + Sync {
    fn build(
        &self,
        config: &CertificateConfig,
        secret_data: Option<&BTreeMap<String, ByteString>>,
    ) -> Result<Arc<dyn IssuanceClient>, ClientBuildError>;
}

/// Builds [`CertApiClient`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct CertApiClientBuilder;

impl ClientBuilder for CertApiClientBuilder {
    fn build(
        &self,
        config: &CertificateConfig,
        secret_data: Option<&BTreeMap<String, ByteString>>,
    ) -> Result<Arc<dyn IssuanceClient>, ClientBuildError> {
        let credentials = Credentials::from_secret_data(secret_data)?;
        let timeout = config.spec.wait_timeout()?;
        Ok(Arc::new(CertApiClient::new(
            credentials,
            timeout,
            config.spec.insecure_skip_tls_verify,
        )))
    }
}
