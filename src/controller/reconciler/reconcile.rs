//! # Reconciliation Logic
//!
//! Main reconciliation loop for Certificate resources.
//!
//! Linear with early exits:
//! load → renewal decision → {up to date | issue → fetch validity → download → materialize}.
//! Every failure after the configuration is loaded is recorded as the
//! singleton Error condition before the pass is aborted.

use crate::controller::reconciler::issuance::{self, ValidityWindow};
use crate::controller::reconciler::status::{fail, record_condition, update_status};
use crate::controller::reconciler::types::{
    backoff_key, Reconciler, ReconcilerError, StepFailure,
};
use crate::crd::{Certificate, CertificateConfig, ConditionReason};
use crate::observability::metrics;
use crate::provider::IssuanceClient;
use chrono::{Duration as ChronoDuration, Utc};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

pub(crate) const CONTROLLER: &str = "certificate";

/// Reconcile one Certificate. Errors are retried by the error policy with backoff.
pub async fn reconcile(
    certificate: Arc<Certificate>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = certificate.name_any();
    let namespace = certificate.namespace().unwrap_or_default();
    let span = tracing::info_span!("reconcile", certificate = %name, namespace = %namespace);

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(CONTROLLER);
        info!("Reconciling Certificate");

        let result = reconcile_internal(&ctx, &namespace, &name).await;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        if result.is_ok()
            && ctx.reset_backoff(&backoff_key("Certificate", Some(&namespace), &name))
        {
            info!("Certificate recovered, backoff reset");
        }
        result
    }
    .instrument(span)
    .await
}

/// Renewal decision: valid while `validTo` is later than `now - daysBeforeRenewal`
#[must_use]
pub fn is_certificate_valid(certificate: &Certificate, config: &CertificateConfig) -> bool {
    // Out-of-range windows make every certificate due for renewal
    let Some(renew_date) = ChronoDuration::try_days(config.spec.days_before_renewal)
        .and_then(|window| Utc::now().checked_sub_signed(window))
    else {
        return false;
    };
    certificate
        .status
        .as_ref()
        .and_then(|s| s.valid_to)
        .is_some_and(|valid_to| valid_to > renew_date)
}

async fn reconcile_internal(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
) -> Result<Action, ReconcilerError> {
    let mut certificate = match ctx.store.get_certificate(namespace, name).await {
        Ok(certificate) => certificate,
        Err(e) if e.is_not_found() => {
            debug!("Certificate no longer exists");
            return Ok(Action::await_change());
        }
        Err(e) => return Err(ReconcilerError::GetCertificate(e)),
    };

    let config_name = certificate.spec.config_ref.name.clone();
    let config = match ctx.store.get_certificate_config(&config_name).await {
        Ok(config) => config,
        Err(e) => {
            let failure = StepFailure::new(
                ConditionReason::ConfigRetrievalFailed,
                ReconcilerError::ConfigRetrieval(e),
            );
            return Err(fail(ctx, &mut certificate, failure).await);
        }
    };

    let secret_ref = &config.spec.secret_ref;
    let credentials = ctx
        .store
        .get_secret(&secret_ref.namespace, &secret_ref.name)
        .await
        .map_err(ReconcilerError::GetSecret)?;

    let client = ctx
        .client_builder
        .build(&config, credentials.data.as_ref())
        .map_err(ReconcilerError::BuildClient)?;

    if is_certificate_valid(&certificate, &config) {
        let refresh = if config.spec.force_expiration_update {
            force_validity_refresh(client.as_ref(), &certificate).await
        } else {
            None
        };

        // One write for the cleared condition and the refresh outcome
        update_status(ctx, &mut certificate, |status| match refresh {
            Some(Ok(window)) => {
                status.clear_error();
                window.apply(status);
            }
            Some(Err((reason, message))) => status.set_error(reason, message),
            None => status.clear_error(),
        })
        .await?;

        if secret_up_to_date(ctx, &certificate, namespace).await? {
            debug!("Certificate valid and secret up to date");
            return Ok(Action::requeue(ctx.config.resync_interval()));
        }
        info!("Certificate valid but secret needs to be written");
    }

    run_pipeline(ctx, client.as_ref(), &mut certificate).await
}

/// Re-read validity of the current guid.
///
/// A failure becomes the reason and message of the Error condition and the
/// pass continues. `None` when no guid was recorded yet.
async fn force_validity_refresh(
    client: &dyn IssuanceClient,
    certificate: &Certificate,
) -> Option<Result<ValidityWindow, (ConditionReason, String)>> {
    let Some(guid) = certificate.status.as_ref().and_then(|s| s.guid.clone()) else {
        warn!("forceExpirationUpdate set but no guid recorded, skipping refresh");
        return None;
    };

    Some(
        issuance::fetch_validity(client, &guid)
            .await
            .map_err(|failure| {
                warn!(guid = %guid, error = %failure.error, "Forced validity refresh failed");
                (failure.reason, failure.message())
            }),
    )
}

/// True when the secret was written under the current name and still exists
async fn secret_up_to_date(
    ctx: &Reconciler,
    certificate: &Certificate,
    namespace: &str,
) -> Result<bool, ReconcilerError> {
    if certificate.secret_name_changed() {
        info!(secret = %certificate.spec.secret_name, "Secret name changed");
        return Ok(false);
    }

    match ctx
        .store
        .get_secret(namespace, &certificate.spec.secret_name)
        .await
    {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => {
            info!(secret = %certificate.spec.secret_name, "Secret deleted, recreating");
            Ok(false)
        }
        Err(e) => Err(ReconcilerError::GetSecret(e)),
    }
}

async fn run_pipeline(
    ctx: &Reconciler,
    client: &dyn IssuanceClient,
    certificate: &mut Certificate,
) -> Result<Action, ReconcilerError> {
    let guid = match issuance::issue_or_resume(ctx, client, certificate).await {
        Ok(guid) => guid,
        Err(failure) => return Err(fail(ctx, certificate, failure).await),
    };

    match issuance::refresh_validity(ctx, client, certificate, &guid).await {
        Ok(()) => {}
        Err(failure) if failure.is_upstream_not_found() => {
            record_condition(ctx, certificate, failure.reason, &failure.message()).await?;
            let delay = ctx.config.not_found_requeue();
            info!(
                guid = %guid,
                requeue_after_secs = delay.as_secs(),
                "Cert API does not know the certificate yet, requeueing"
            );
            metrics::increment_requeues("upstream-not-found");
            return Ok(Action::requeue(delay));
        }
        Err(failure) => return Err(fail(ctx, certificate, failure).await),
    }

    let material = match issuance::download(client, certificate, &guid).await {
        Ok(material) => material,
        Err(failure) => return Err(fail(ctx, certificate, failure).await),
    };

    if let Err(failure) = issuance::materialize_secret(ctx, certificate, &material).await {
        return Err(fail(ctx, certificate, failure).await);
    }

    metrics::increment_certificates_issued();
    Ok(Action::requeue(ctx.config.resync_interval()))
}
