//! # CertificateConfig Reconciler
//!
//! Keeps the `cert.dana.io/check-dependencies` finalizer on every
//! CertificateConfig and only releases it once no Certificate references the
//! config anymore.

use crate::constants::DEPENDENCIES_FINALIZER;
use crate::controller::reconciler::{backoff_key, Reconciler, ReconcilerError};
use crate::crd::CertificateConfig;
use crate::observability::metrics;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

pub(crate) const CONTROLLER: &str = "certificateconfig";

pub async fn reconcile_config(
    config: Arc<CertificateConfig>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = config.name_any();
    let span = tracing::info_span!("reconcile", certificate_config = %name);

    async move {
        metrics::increment_reconciliations(CONTROLLER);
        info!("Reconciling CertificateConfig");

        let result = reconcile_config_internal(&ctx, &name).await;
        if result.is_ok() {
            ctx.reset_backoff(&backoff_key("CertificateConfig", None, &name));
        }
        result
    }
    .instrument(span)
    .await
}

async fn reconcile_config_internal(
    ctx: &Reconciler,
    name: &str,
) -> Result<Action, ReconcilerError> {
    let mut config = match ctx.store.get_certificate_config(name).await {
        Ok(config) => config,
        Err(e) if e.is_not_found() => return Ok(Action::await_change()),
        Err(e) => return Err(ReconcilerError::ConfigRetrieval(e)),
    };

    if config.meta().deletion_timestamp.is_some() {
        return handle_delete(ctx, &mut config).await;
    }

    let secret_ref = &config.spec.secret_ref;
    ctx.store
        .get_secret(&secret_ref.namespace, &secret_ref.name)
        .await
        .map_err(ReconcilerError::GetSecret)?;

    if !config.finalizers().iter().any(|f| f == DEPENDENCIES_FINALIZER) {
        config.finalizers_mut().push(DEPENDENCIES_FINALIZER.to_string());
        ctx.store
            .replace_certificate_config(&config)
            .await
            .map_err(ReconcilerError::UpdateConfig)?;
        debug!(finalizer = DEPENDENCIES_FINALIZER, "Added finalizer");
    }

    Ok(Action::await_change())
}

/// Release the finalizer once no Certificate references the config
async fn handle_delete(
    ctx: &Reconciler,
    config: &mut CertificateConfig,
) -> Result<Action, ReconcilerError> {
    info!("Deletion detected, checking for associated Certificates");

    let certificates = ctx
        .store
        .list_certificates_for_config(&config.name_any())
        .await
        .map_err(ReconcilerError::ListCertificates)?;
    if !certificates.is_empty() {
        info!(count = certificates.len(), "Found associated Certificates");
        return Err(ReconcilerError::CertificatesExist);
    }

    let before = config.finalizers().len();
    config.finalizers_mut().retain(|f| f != DEPENDENCIES_FINALIZER);
    if config.finalizers().len() != before {
        ctx.store
            .replace_certificate_config(config)
            .await
            .map_err(ReconcilerError::UpdateConfig)?;
        info!(finalizer = DEPENDENCIES_FINALIZER, "Cleaned up finalizer");
    }

    Ok(Action::await_change())
}
