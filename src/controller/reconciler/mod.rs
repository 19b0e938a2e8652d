//! # Reconciler
//!
//! Core reconciliation logic for `Certificate` resources.
//!
//! ## Reconciliation Flow
//!
//! 1. Load the Certificate and its CertificateConfig
//! 2. Build a Cert API client from the referenced credentials Secret
//! 3. Decide whether the certificate is still valid and its secret current
//! 4. Otherwise issue, fetch validity, download and decode the archive
//! 5. Write the TLS secret and clear the Error condition

pub mod issuance;
pub mod reconcile;
pub mod status;
pub mod types;

pub use reconcile::{is_certificate_valid, reconcile};
pub use types::{backoff_key, Reconciler, ReconcilerError, StepFailure};
