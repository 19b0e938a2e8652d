//! # Types
//!
//! Core types for the reconcilers.

use crate::certhandler::{DecodeError, OwnerRefError, SecretError};
use crate::config::ControllerConfig;
use crate::constants::UPSTREAM_NOT_FOUND;
use crate::controller::backoff::BackoffState;
use crate::controller::store::{ClusterStore, StoreError};
use crate::crd::ConditionReason;
use crate::provider::{CertApiError, ClientBuildError, ClientBuilder};
use std::collections::HashMap;
use std::error::Error as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to get Certificate: {0}")]
    GetCertificate(#[source] StoreError),
    #[error("failed to get CertificateConfig: {0}")]
    ConfigRetrieval(#[source] StoreError),
    #[error("failed to get secret: {0}")]
    GetSecret(#[source] StoreError),
    #[error("failed to build Cert client: {0}")]
    BuildClient(#[source] ClientBuildError),
    #[error("failed to create Certificate: {0}")]
    Issue(#[source] CertApiError),
    #[error("failed to get certificate data: {0}")]
    FetchValidity(#[source] CertApiError),
    #[error("failed to parse validTo: {0}")]
    ParseValidTo(#[source] chrono::ParseError),
    #[error("failed to parse validFrom: {0}")]
    ParseValidFrom(#[source] chrono::ParseError),
    #[error("failed downloading certificate: {0}")]
    Download(#[source] CertApiError),
    #[error("failed decoding certificate: {0}")]
    Decode(#[source] DecodeError),
    #[error("failed to set owner reference for secret {secret}: {source}")]
    OwnerReference {
        secret: String,
        #[source]
        source: OwnerRefError,
    },
    #[error("failed to create or update tls secret: {0}")]
    TlsSecret(#[source] SecretError),
    #[error("failed to update Certificate status: {0}")]
    StatusUpdate(#[source] StoreError),
    #[error("cannot delete CertificateConfig because associated Certificates exist")]
    CertificatesExist,
    #[error("failed to list Certificates: {0}")]
    ListCertificates(#[source] StoreError),
    #[error("failed to update CertificateConfig: {0}")]
    UpdateConfig(#[source] StoreError),
}

/// A failed pipeline step and the condition reason it is recorded under
#[derive(Debug)]
pub struct StepFailure {
    pub reason: ConditionReason,
    pub error: ReconcilerError,
}

impl StepFailure {
    #[must_use]
    pub fn new(reason: ConditionReason, error: ReconcilerError) -> Self {
        Self { reason, error }
    }

    /// Condition message: the text of the underlying error, without the step prefix
    #[must_use]
    pub fn message(&self) -> String {
        self.error
            .source()
            .map_or_else(|| self.error.to_string(), ToString::to_string)
    }

    /// The Cert API answered a validity fetch with 404.
    ///
    /// Matches on the status text, same as the condition check that
    /// suppresses re-issuance.
    #[must_use]
    pub fn is_upstream_not_found(&self) -> bool {
        self.reason == ConditionReason::GetCertDataFromCertApiFailed
            && self.error.to_string().contains(UPSTREAM_NOT_FOUND)
    }
}

/// Shared context of the Certificate and CertificateConfig controllers
#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn ClusterStore>,
    // Issuance clients are built per reconcile so credential rotation applies immediately
    pub client_builder: Arc<dyn ClientBuilder>,
    pub config: ControllerConfig,
    // Backoff state per resource, keyed by `backoff_key`
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        store: Arc<dyn ClusterStore>,
        client_builder: Arc<dyn ClientBuilder>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            client_builder,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a failure for `key` and return the delay before the next attempt
    pub fn next_backoff(&self, key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_insert_with(|| {
                    BackoffState::new(
                        self.config.backoff_min_minutes,
                        self.config.backoff_max_minutes,
                    )
                });
                let delay = state.record_failure();
                (delay, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(self.config.backoff_min_minutes * 60), 0)
            }
        }
    }

    /// Forget the failure history of `key`. Returns true if it had failures.
    pub fn reset_backoff(&self, key: &str) -> bool {
        self.backoff_states
            .lock()
            .ok()
            .and_then(|mut states| states.remove(key))
            .is_some_and(|state| state.error_count > 0)
    }
}

/// Key of a resource in the backoff map
#[must_use]
pub fn backoff_key(kind: &str, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) => format!("{kind}/{namespace}/{name}"),
        None => format!("{kind}/{name}"),
    }
}
