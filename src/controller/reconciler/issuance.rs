//! # Issuance Pipeline
//!
//! The steps between "this Certificate needs a certificate" and "its TLS
//! secret is written": issue, fetch validity, download and materialize.
//!
//! Each step returns a [`StepFailure`] naming the condition reason its
//! error is recorded under. Recording is left to the caller.

use crate::certhandler::{self, TlsMaterial};
use crate::constants::CERT_API_TIME_FORMAT;
use crate::controller::reconciler::status::{persist_status, update_status};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError, StepFailure};
use crate::crd::{Certificate, CertificateStatus, ConditionReason};
use crate::provider::IssuanceClient;
use chrono::{DateTime, NaiveDateTime, Utc};
use kube::ResourceExt;
use tracing::{debug, info};

type StepResult<T> = Result<T, StepFailure>;

fn status_update_failed(error: ReconcilerError) -> StepFailure {
    StepFailure::new(ConditionReason::StatusUpdateFailed, error)
}

/// Guid recorded in the status, if any
fn recorded_guid(certificate: &Certificate) -> Option<String> {
    certificate
        .status
        .as_ref()
        .and_then(|s| s.guid.clone())
        .filter(|g| !g.is_empty())
}

/// Ask the Cert API for a new certificate and persist the guid it assigned
pub async fn issue(
    ctx: &Reconciler,
    client: &dyn IssuanceClient,
    certificate: &mut Certificate,
) -> StepResult<String> {
    let guid = client
        .issue(&certificate.spec.certificate_data)
        .await
        .map_err(|e| {
            StepFailure::new(
                ConditionReason::PostToCertApiFailed,
                ReconcilerError::Issue(e),
            )
        })?;

    info!(certificate = %certificate.name_any(), guid = %guid, "Certificate requested from Cert API");

    certificate
        .status
        .get_or_insert_with(CertificateStatus::default)
        .guid = Some(guid.clone());
    persist_status(ctx, certificate)
        .await
        .map_err(status_update_failed)?;

    Ok(guid)
}

/// Guid to continue the pipeline with.
///
/// While the Error condition records an upstream "Not Found", the guid of
/// the previous request is reused instead of issuing again, so the Cert API
/// is not flooded with requests while the first one propagates.
pub async fn issue_or_resume(
    ctx: &Reconciler,
    client: &dyn IssuanceClient,
    certificate: &mut Certificate,
) -> StepResult<String> {
    let pending = certificate
        .status
        .as_ref()
        .is_some_and(CertificateStatus::has_not_found_error);

    if pending {
        if let Some(guid) = recorded_guid(certificate) {
            debug!(
                certificate = %certificate.name_any(),
                guid = %guid,
                "Previous request not yet known to the Cert API, skipping issuance"
            );
            return Ok(guid);
        }
    }

    issue(ctx, client, certificate).await
}

/// Parse a Cert API timestamp (`YYYY-MM-DDTHH:MM:SS`, UTC)
pub fn parse_cert_api_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, CERT_API_TIME_FORMAT).map(|t| t.and_utc())
}

/// Validity of an issued certificate as reported by the Cert API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityWindow {
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub signature_hash_algorithm: String,
}

impl ValidityWindow {
    /// Record the window in `status`, dropping a pending "Not Found" condition
    pub fn apply(self, status: &mut CertificateStatus) {
        if status.has_not_found_error() {
            status.clear_error();
        }
        status.record_validity(self.valid_from, self.valid_to, self.signature_hash_algorithm);
    }
}

/// Fetch and parse the validity window of `guid` without touching the status
pub async fn fetch_validity(client: &dyn IssuanceClient, guid: &str) -> StepResult<ValidityWindow> {
    let validity = client.fetch_validity(guid).await.map_err(|e| {
        StepFailure::new(
            ConditionReason::GetCertDataFromCertApiFailed,
            ReconcilerError::FetchValidity(e),
        )
    })?;

    let valid_to = parse_cert_api_time(&validity.valid_to).map_err(|e| {
        StepFailure::new(
            ConditionReason::ParseValidToFailed,
            ReconcilerError::ParseValidTo(e),
        )
    })?;
    let valid_from = parse_cert_api_time(&validity.valid_from).map_err(|e| {
        StepFailure::new(
            ConditionReason::ParseValidFromFailed,
            ReconcilerError::ParseValidFrom(e),
        )
    })?;

    Ok(ValidityWindow {
        valid_from,
        valid_to,
        signature_hash_algorithm: validity.signature_hash_algorithm,
    })
}

/// Fetch the validity window of `guid` and persist it in a single status write
pub async fn refresh_validity(
    ctx: &Reconciler,
    client: &dyn IssuanceClient,
    certificate: &mut Certificate,
    guid: &str,
) -> StepResult<()> {
    let window = fetch_validity(client, guid).await?;
    let valid_to = window.valid_to;

    update_status(ctx, certificate, |status| window.apply(status))
        .await
        .map_err(status_update_failed)?;

    debug!(
        certificate = %certificate.name_any(),
        guid = %guid,
        valid_to = %valid_to,
        "Recorded certificate validity"
    );
    Ok(())
}

/// Download the archive of `guid` and decode it
pub async fn download(
    client: &dyn IssuanceClient,
    certificate: &Certificate,
    guid: &str,
) -> StepResult<TlsMaterial> {
    let archive = client
        .download(guid, &certificate.spec.certificate_data.form)
        .await
        .map_err(|e| {
            StepFailure::new(
                ConditionReason::DownloadCertFromCertApiFailed,
                ReconcilerError::Download(e),
            )
        })?;

    certhandler::decode(&archive.data, &archive.password).map_err(|e| {
        StepFailure::new(ConditionReason::DecodeCertFailed, ReconcilerError::Decode(e))
    })
}

/// Write the TLS secret owned by `certificate` and record its name in the status
pub async fn materialize_secret(
    ctx: &Reconciler,
    certificate: &mut Certificate,
    material: &TlsMaterial,
) -> StepResult<()> {
    let namespace = certificate.namespace().unwrap_or_default();
    let mut secret = certhandler::tls_secret(material, certificate, &namespace);

    certhandler::set_owner_reference(certificate, &mut secret).map_err(|source| {
        StepFailure::new(
            ConditionReason::SetOwnerRefFailed,
            ReconcilerError::OwnerReference {
                secret: secret.name_any(),
                source,
            },
        )
    })?;

    certhandler::create_or_update_tls_secret(ctx.store.as_ref(), &secret)
        .await
        .map_err(|e| {
            StepFailure::new(
                ConditionReason::CreateOrUpdateTlsSecretFailed,
                ReconcilerError::TlsSecret(e),
            )
        })?;

    let status = certificate
        .status
        .get_or_insert_with(CertificateStatus::default);
    status.secret_name = Some(certificate.spec.secret_name.clone());
    status.clear_error();
    persist_status(ctx, certificate)
        .await
        .map_err(status_update_failed)?;

    info!(
        certificate = %certificate.name_any(),
        namespace = %namespace,
        secret = %certificate.spec.secret_name,
        "TLS secret up to date"
    );
    Ok(())
}
