//! # Status Updates
//!
//! Status writes of the Certificate reconciler. Every write adopts the object
//! returned by the API server, so the next write in the same pass carries a
//! current resourceVersion.

use crate::controller::reconciler::types::{Reconciler, ReconcilerError, StepFailure};
use crate::crd::{Certificate, CertificateStatus, ConditionReason};
use kube::ResourceExt;
use tracing::{debug, warn};

/// Write the status of `certificate` and adopt the stored object
pub async fn persist_status(
    ctx: &Reconciler,
    certificate: &mut Certificate,
) -> Result<(), ReconcilerError> {
    let stored = ctx
        .store
        .replace_certificate_status(certificate)
        .await
        .map_err(ReconcilerError::StatusUpdate)?;
    *certificate = stored;
    Ok(())
}

/// Apply `change` to the status and persist it, skipping the write when nothing changed
pub async fn update_status<F>(
    ctx: &Reconciler,
    certificate: &mut Certificate,
    change: F,
) -> Result<(), ReconcilerError>
where
    F: FnOnce(&mut CertificateStatus),
{
    let before = certificate.status.clone();
    change(certificate.status.get_or_insert_with(CertificateStatus::default));
    if certificate.status == before {
        debug!(certificate = %certificate.name_any(), "Status unchanged, skipping update");
        return Ok(());
    }
    persist_status(ctx, certificate).await
}

/// Set the Error condition and persist it
pub async fn record_condition(
    ctx: &Reconciler,
    certificate: &mut Certificate,
    reason: ConditionReason,
    message: &str,
) -> Result<(), ReconcilerError> {
    update_status(ctx, certificate, |status| status.set_error(reason, message)).await
}

/// Record `failure` as the Error condition and return the error that aborts the pass.
///
/// If the condition itself cannot be written, the status write error is
/// returned instead.
pub async fn fail(
    ctx: &Reconciler,
    certificate: &mut Certificate,
    failure: StepFailure,
) -> ReconcilerError {
    let message = failure.message();
    match record_condition(ctx, certificate, failure.reason, &message).await {
        Ok(()) => failure.error,
        Err(update_error) => {
            warn!(
                certificate = %certificate.name_any(),
                reason = %failure.reason,
                error = %failure.error,
                "Failed to record Error condition"
            );
            update_error
        }
    }
}
