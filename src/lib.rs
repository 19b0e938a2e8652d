//! Certificate Operator Library
//!
//! Reconciles `Certificate` resources against the Cert API and stores the
//! issued certificates as TLS secrets.
//!
//! ## Quick Start
//!
//! ```rust
//! use certificate_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod certhandler;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
