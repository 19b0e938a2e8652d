//! # Certificate Operator
//!
//! Kubernetes operator that issues TLS certificates through the Cert API and
//! stores them as `kubernetes.io/tls` secrets.
//!
//! ## Overview
//!
//! 1. **Certificate** resources describe the subject, SANs and template of a
//!    certificate and the secret it should be written to
//! 2. **CertificateConfig** resources point at the Cert API credentials and set
//!    the renewal window
//! 3. The operator requests the certificate, waits until the Cert API knows it,
//!    downloads the PKCS#12 archive and writes the decoded PEM pair to the secret
//!
//! Settings come from environment variables; command line flags take precedence.

use anyhow::Result;
use certificate_operator::config::{ControllerConfig, LogFormat};
use certificate_operator::runtime::{initialization::initialize, watch_loop::run_watch_loop};
use clap::Parser;

/// Certificate Operator
#[derive(Parser, Debug)]
#[command(name = "certificate-operator", version, about, long_about = None)]
struct Args {
    /// Port of the metrics and probe server
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Log level of the operator's own targets (ignored when RUST_LOG is set)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format: json or text
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Seconds between re-evaluations of valid certificates
    #[arg(long)]
    resync_interval_secs: Option<u64>,

    /// Maximum concurrent reconciliations per controller
    #[arg(long)]
    max_concurrent_reconciliations: Option<u16>,
}

impl Args {
    fn apply(self, config: &mut ControllerConfig) {
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(level) = self.log_level {
            config.log_level = Some(level);
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(secs) = self.resync_interval_secs {
            config.resync_interval_secs = secs;
        }
        if let Some(max) = self.max_concurrent_reconciliations {
            config.max_concurrent_reconciliations = max;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = ControllerConfig::from_env();
    Args::parse().apply(&mut config);

    let init = initialize(config).await?;
    run_watch_loop(init.client, init.reconciler, init.server_state).await;
    Ok(())
}
