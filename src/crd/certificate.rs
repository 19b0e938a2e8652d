//! # Certificate
//!
//! Desired TLS certificate and the Secret it is materialized into.

use crate::constants::DEFAULT_CERTIFICATE_FORM;
use crate::crd::status::CertificateStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Certificate Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cert.dana.io/v1alpha1
/// kind: Certificate
/// metadata:
///   name: my-service
///   namespace: default
/// spec:
///   secretName: my-service-tls
///   configRef:
///     name: cert-api
///   certificateData:
///     subject:
///       commonName: my-service.example.com
///     san:
///       dns:
///         - my-service.example.com
///     template: web-server
///     form: pfx
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Certificate",
    group = "cert.dana.io",
    version = "v1alpha1",
    namespaced,
    status = "CertificateStatus",
    shortname = "cert",
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".status.secretName"}"#,
    printcolumn = r#"{"name":"Valid To", "type":"string", "jsonPath":".status.validTo"}"#,
    printcolumn = r#"{"name":"Error", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Error\")].reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Data used to request the certificate from the Cert API
    #[serde(default)]
    pub certificate_data: CertificateData,
    /// Name of the TLS Secret the issued certificate is stored in
    #[serde(default)]
    pub secret_name: String,
    /// Reference to the cluster-scoped CertificateConfig
    pub config_ref: ConfigReference,
}

/// Reference to a CertificateConfig resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReference {
    pub name: String,
}

/// Data for generating a certificate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    #[serde(default)]
    pub subject: Subject,
    /// Subject Alternative Names
    #[serde(default)]
    pub san: San,
    /// Cert API template the certificate is issued from
    #[serde(default)]
    pub template: String,
    /// Archive form to download (only `pfx` is supported)
    #[serde(default = "default_form")]
    #[schemars(regex(pattern = r"^pfx$"))]
    pub form: String,
}

impl Default for CertificateData {
    fn default() -> Self {
        Self {
            subject: Subject::default(),
            san: San::default(),
            template: String::new(),
            form: default_form(),
        }
    }
}

#[must_use]
pub fn default_form() -> String {
    DEFAULT_CERTIFICATE_FORM.to_string()
}

/// Subject of a certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub organization_unit: String,
}

/// Subject Alternative Names of a certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct San {
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub ips: Vec<String>,
}

impl Certificate {
    /// True when the desired secret name differs from the last materialized one
    #[must_use]
    pub fn secret_name_changed(&self) -> bool {
        let recorded = self
            .status
            .as_ref()
            .and_then(|s| s.secret_name.as_deref())
            .unwrap_or_default();
        recorded != self.spec.secret_name
    }
}
