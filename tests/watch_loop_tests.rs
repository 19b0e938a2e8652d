//! Which Certificate events start a reconcile

mod common;

use certificate_operator::controller::reconciler::reconcile;
use certificate_operator::crd::Certificate;
use certificate_operator::runtime::watch_loop::certificate_triggers;
use common::*;
use futures::{stream, StreamExt};
use kube_runtime::watcher;
use std::sync::Arc;

/// Names of the objects that make it through the trigger filter
async fn triggered(events: Vec<Certificate>) -> Vec<Option<String>> {
    let events = events.into_iter().map(Ok::<_, watcher::Error>);
    certificate_triggers(stream::iter(events))
        .map(|event| event.unwrap().metadata.resource_version)
        .collect()
        .await
}

#[tokio::test]
async fn test_failing_pass_does_not_trigger_itself() {
    let mut behaviour = healthy_behaviour();
    behaviour.archive_password = "not-the-password".to_string();
    let harness = Harness::new(behaviour).await;
    let observed = harness.stored_certificate().await;

    reconcile(Arc::new(certificate()), Arc::clone(&harness.ctx))
        .await
        .unwrap_err();

    let written = harness.stored_certificate().await;
    assert!(harness.store.status_writes().await >= 3);
    assert_ne!(written.metadata.resource_version, observed.metadata.resource_version);
    assert_eq!(written.metadata.generation, observed.metadata.generation);

    let observed_version = observed.metadata.resource_version.clone();
    assert_eq!(triggered(vec![observed, written]).await, vec![observed_version]);
    assert_eq!(harness.client.issue_calls(), 1);
}

#[tokio::test]
async fn test_every_status_write_of_a_pass_is_filtered() {
    let harness = Harness::new(healthy_behaviour()).await;
    let mut events = vec![harness.stored_certificate().await];

    // Snapshot the object after each pass, as the watch would see it
    for _ in 0..3 {
        reconcile(Arc::new(certificate()), Arc::clone(&harness.ctx))
            .await
            .unwrap();
        events.push(harness.stored_certificate().await);
    }

    assert_eq!(triggered(events).await.len(), 1);
}

#[tokio::test]
async fn test_spec_change_triggers_reconcile() {
    let harness = Harness::new(healthy_behaviour()).await;
    let observed = harness.stored_certificate().await;
    reconcile(Arc::new(certificate()), Arc::clone(&harness.ctx))
        .await
        .unwrap();
    let reconciled = harness.stored_certificate().await;

    harness
        .store
        .edit_certificate(NAMESPACE, CERTIFICATE, |c| {
            c.spec.secret_name = "web-tls-v2".to_string();
        })
        .await;
    let renamed = harness.stored_certificate().await;
    assert_ne!(renamed.metadata.generation, reconciled.metadata.generation);

    let expected = vec![
        observed.metadata.resource_version.clone(),
        renamed.metadata.resource_version.clone(),
    ];
    assert_eq!(triggered(vec![observed, reconciled, renamed]).await, expected);
}

#[tokio::test]
async fn test_label_edit_does_not_trigger_reconcile() {
    let harness = Harness::new(healthy_behaviour()).await;
    let observed = harness.stored_certificate().await;

    harness
        .store
        .edit_certificate(NAMESPACE, CERTIFICATE, |c| {
            c.metadata
                .labels
                .get_or_insert_with(Default::default)
                .insert("team".to_string(), "platform".to_string());
        })
        .await;
    let labelled = harness.stored_certificate().await;

    assert_eq!(triggered(vec![observed, labelled]).await.len(), 1);
}
