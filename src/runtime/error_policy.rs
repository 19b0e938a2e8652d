//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loops.
//!
//! Failed reconciliations are retried with a Fibonacci backoff tracked per
//! resource, so many failing resources do not slow each other down. The
//! reconcilers reset the backoff of a resource when a pass succeeds.

use crate::controller::reconciler::{backoff_key, Reconciler, ReconcilerError};
use crate::crd::{Certificate, CertificateConfig};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle Certificate reconciliation errors with Fibonacci backoff
pub fn handle_certificate_error(
    obj: Arc<Certificate>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let key = backoff_key("Certificate", Some(&namespace), &name);

    error!(
        certificate = %name,
        namespace = %namespace,
        error = %error,
        "Reconciliation error"
    );
    backoff_action(&ctx, &key, "certificate")
}

/// Handle CertificateConfig reconciliation errors with Fibonacci backoff
pub fn handle_config_error(
    obj: Arc<CertificateConfig>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let key = backoff_key("CertificateConfig", None, &name);

    error!(certificate_config = %name, error = %error, "Reconciliation error");
    backoff_action(&ctx, &key, "certificateconfig")
}

fn backoff_action(ctx: &Reconciler, key: &str, controller: &str) -> Action {
    metrics::increment_reconciliation_errors(controller);

    let (delay, error_count) = ctx.next_backoff(key);
    info!(
        resource = %key,
        backoff_secs = delay.as_secs(),
        error_count,
        "Retrying with Fibonacci backoff"
    );

    metrics::increment_requeues("error-backoff");
    Action::requeue(delay)
}
