//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of `Certificate` and
//! `CertificateConfig` as a multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/bases/cert.dana.io.yaml
//!
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use certificate_operator::crd::{Certificate, CertificateConfig};
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [Certificate::crd(), CertificateConfig::crd()];
    for crd in &crds {
        print!("---\n{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
