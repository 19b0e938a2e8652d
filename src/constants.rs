//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default periodic resync interval for valid certificates (seconds)
/// Renewal is only noticed when a Certificate is reconciled, so valid
/// certificates are requeued on this interval
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 3600;

/// Default maximum number of concurrent reconciliations per controller
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Requeue delay after the Cert API answered "Not Found" for a freshly issued guid
pub const NOT_FOUND_REQUEUE_SECS: u64 = 5;

/// Fibonacci backoff bounds for failed reconciliations (minutes)
pub const BACKOFF_MIN_MINUTES: u64 = 1;
pub const BACKOFF_MAX_MINUTES: u64 = 10;

/// Default timeout for a single Cert API exchange (seconds)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 60;

/// HTTP status text the Cert API client surfaces for a 404.
/// Matched as a substring of condition messages and error text.
pub const UPSTREAM_NOT_FOUND: &str = "Not Found";

/// Finalizer guarding CertificateConfig deletion while Certificates reference it
pub const DEPENDENCIES_FINALIZER: &str = "cert.dana.io/check-dependencies";

/// Key of the credentials JSON inside the referenced Secret
pub const CREDENTIALS_KEY: &str = "credentials";

/// Wire format of validFrom / validTo returned by the Cert API
pub const CERT_API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Default archive form requested from the Cert API
pub const DEFAULT_CERTIFICATE_FORM: &str = "pfx";
