//! # Runtime
//!
//! Controller runtime: initialization, watch loops and error policy.
//!
//! - `initialization.rs` - rustls, logging, metrics, probe server and client setup
//! - `watch_loop.rs` - Certificate and CertificateConfig controllers
//! - `error_policy.rs` - Fibonacci backoff for failed reconciliations

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
