//! # Controller
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `config_reconciler`: finalizer handling of CertificateConfig
//! - `reconciler`: Certificate reconciliation
//! - `server`: HTTP server for metrics and health checks
//! - `store`: cluster reads and writes
//! - `validation`: Kubernetes duration strings

pub mod backoff;
pub mod config_reconciler;
pub mod reconciler;
pub mod server;
pub mod store;
pub mod validation;
