//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use certificate_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Issuance client abstraction
pub use crate::provider::{ClientBuilder, IssuanceClient};

// Cluster access
pub use crate::controller::store::{ClusterStore, StoreError};

// Reconciler types
pub use crate::controller::config_reconciler::reconcile_config;
pub use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError};

pub use crate::config::{ControllerConfig, LogFormat};
