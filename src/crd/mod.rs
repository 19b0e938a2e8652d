//! # Custom Resource Definitions
//!
//! CRD types for the Certificate Operator.
//!
//! ## Module Structure
//!
//! - `certificate.rs` - The namespaced `Certificate` resource
//! - `certificate_config.rs` - The cluster-scoped `CertificateConfig` resource
//! - `status.rs` - Certificate status and the singleton-by-type condition set

mod certificate;
mod certificate_config;
mod status;

pub use certificate::{
    default_form, Certificate, CertificateData, CertificateSpec, ConfigReference, San, Subject,
};
pub use certificate_config::{
    CertificateConfig, CertificateConfigSpec, CertificateConfigStatus, SecretRef,
};
pub use status::{
    CertificateStatus, Condition, ConditionReason, Conditions, CONDITION_ERROR,
};
