//! # Watch Loop
//!
//! Runs the Certificate and CertificateConfig controllers side by side until
//! a shutdown signal arrives.

use crate::controller::config_reconciler::reconcile_config;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{Certificate, CertificateConfig};
use crate::runtime::error_policy::{handle_certificate_error, handle_config_error};
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, Client};
use kube_runtime::{
    controller::Config, predicates, reflector, watcher, Controller, WatchStreamExt,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Certificate events that start a reconcile.
///
/// Only objects with a generation not seen before pass. Status writes leave
/// `metadata.generation` untouched, so the reconciler's own writes never
/// trigger it again and failed passes wait out the error policy backoff.
/// Requeues and owned Secret events are scheduled independently of this filter.
pub fn certificate_triggers<S>(
    events: S,
) -> impl Stream<Item = Result<Certificate, watcher::Error>> + Send
where
    S: Stream<Item = Result<Certificate, watcher::Error>> + Send + 'static,
{
    events.predicate_filter(predicates::generation)
}

/// Run both controllers. Returns once both streams have ended.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) {
    let concurrency = reconciler.config.max_concurrent_reconciliations;
    info!(concurrency, "Starting controller watch loops");

    let certificates: Api<Certificate> = Api::all(client.clone());
    let secrets: Api<Secret> = Api::all(client.clone());
    let configs: Api<CertificateConfig> = Api::all(client);

    let (reader, writer) = reflector::store();
    let certificate_events = watcher(certificates, watcher::Config::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects();

    // Owned secrets are watched so a deleted TLS secret is written again
    let certificate_controller =
        Controller::for_stream(certificate_triggers(certificate_events), reader)
            .owns(secrets, watcher::Config::default())
            .with_config(Config::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(reconcile, handle_certificate_error, reconciler.clone())
            .for_each(|result| async move {
                match result {
                    Ok((obj, action)) => debug!(object = %obj, ?action, "Certificate reconciled"),
                    Err(e) => warn!(error = %e, "Certificate controller error"),
                }
            });

    let config_controller = Controller::new(configs, watcher::Config::default())
        .with_config(Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile_config, handle_config_error, reconciler)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    debug!(object = %obj, ?action, "CertificateConfig reconciled");
                }
                Err(e) => warn!(error = %e, "CertificateConfig controller error"),
            }
        });

    server_state.set_ready(true);
    futures::join!(certificate_controller, config_controller);

    server_state.set_ready(false);
    info!("Controllers stopped");
}
