//! # Configuration
//!
//! Operator-level configuration. Per-Certificate settings live on the
//! `CertificateConfig` resource instead.

mod controller;

pub use controller::{ControllerConfig, LogFormat};
