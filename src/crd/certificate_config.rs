//! # CertificateConfig
//!
//! Cluster-scoped settings shared by Certificates: where the Cert API
//! credentials live, when to renew, and how long to wait on the Cert API.

use crate::constants::DEFAULT_WAIT_TIMEOUT_SECS;
use crate::controller::validation::{parse_kubernetes_duration, DurationError};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// CertificateConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cert.dana.io/v1alpha1
/// kind: CertificateConfig
/// metadata:
///   name: cert-api
/// spec:
///   secretRef:
///     name: cert-api-credentials
///     namespace: certificate-operator-system
///   daysBeforeRenewal: 7
///   waitTimeout: 2m
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "CertificateConfig",
    group = "cert.dana.io",
    version = "v1alpha1",
    status = "CertificateConfigStatus",
    shortname = "certcfg"
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateConfigSpec {
    /// Secret holding the Cert API credentials
    pub secret_ref: SecretRef,
    /// Number of days before expiration at which the certificate is renewed
    #[serde(default)]
    pub days_before_renewal: i64,
    /// Maximum time to wait for a Cert API response (e.g. "30s", "1m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<String>,
    /// Re-read the validity of valid certificates on every reconcile
    #[serde(default)]
    pub force_expiration_update: bool,
    /// Skip TLS verification towards the Cert API
    #[serde(default = "default_true")]
    pub insecure_skip_tls_verify: bool,
}

fn default_true() -> bool {
    true
}

/// Reference to a Secret in a given namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
}

/// CertificateConfig carries no observed state
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct CertificateConfigStatus {}

impl CertificateConfigSpec {
    /// Timeout for a single Cert API exchange, defaulting to one minute
    pub fn wait_timeout(&self) -> Result<Duration, DurationError> {
        match self.wait_timeout.as_deref() {
            Some(raw) => parse_kubernetes_duration(raw),
            None => Ok(Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS)),
        }
    }
}
