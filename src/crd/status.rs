//! # Certificate Status
//!
//! Observed state of a Certificate and the condition set that tracks its
//! latest error.
//!
//! Conditions are kept in a map keyed by condition type so a type can only
//! ever appear once. They are serialized as an ordered list, which is what
//! `kubectl` and other tooling expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of the singleton condition recording the most recent failure
pub const CONDITION_ERROR: &str = "Error";

const CONDITION_STATUS_TRUE: &str = "True";

/// Status of the Certificate resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    #[schemars(with = "Vec<Condition>")]
    pub conditions: Conditions,
    /// Time the certificate becomes valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    /// Time the certificate expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Identifier the Cert API assigned to the last issuance request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_hash_algorithm: Option<String>,
    /// Name of the Secret the certificate was last materialized into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

impl CertificateStatus {
    /// Record the validity window returned by the Cert API.
    ///
    /// This is the only way validFrom, validTo and the signature algorithm
    /// are written, so they always change together.
    pub fn record_validity(
        &mut self,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
        signature_hash_algorithm: String,
    ) {
        self.valid_from = Some(valid_from);
        self.valid_to = Some(valid_to);
        self.signature_hash_algorithm = Some(signature_hash_algorithm);
    }

    /// Set the singleton Error condition
    pub fn set_error(&mut self, reason: ConditionReason, message: impl Into<String>) {
        self.conditions.set(Condition::error(reason, message));
    }

    /// Remove the Error condition. No-op when absent.
    pub fn clear_error(&mut self) {
        self.conditions.remove(CONDITION_ERROR);
    }

    #[must_use]
    pub fn error(&self) -> Option<&Condition> {
        self.conditions.get(CONDITION_ERROR)
    }

    /// True when the recorded Error condition carries the upstream
    /// "Not Found" status text.
    ///
    /// This matches on message text, so it depends on the Cert API client
    /// surfacing the HTTP status text verbatim.
    #[must_use]
    pub fn has_not_found_error(&self) -> bool {
        self.error()
            .is_some_and(|c| c.message.contains(crate::constants::UPSTREAM_NOT_FOUND))
    }
}

/// Condition entry, wire-compatible with `metav1.Condition`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g. "Error")
    #[serde(rename = "type")]
    pub r#type: String,
    /// Status of the condition: True, False, or Unknown
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    #[must_use]
    pub fn error(reason: ConditionReason, message: impl Into<String>) -> Self {
        Self {
            r#type: CONDITION_ERROR.to_string(),
            status: CONDITION_STATUS_TRUE.to_string(),
            last_transition_time: Some(Utc::now()),
            reason: reason.as_str().to_string(),
            message: message.into(),
        }
    }
}

/// Conditions keyed by type
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct Conditions(BTreeMap<String, Condition>);

impl Conditions {
    /// Insert or update a condition.
    ///
    /// The transition time of an existing condition is only moved when its
    /// status changes, so re-recording the same failure is a no-op.
    pub fn set(&mut self, mut condition: Condition) {
        if let Some(existing) = self.0.get(&condition.r#type) {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
        }
        self.0.insert(condition.r#type.clone(), condition);
    }

    pub fn remove(&mut self, condition_type: &str) -> Option<Condition> {
        self.0.remove(condition_type)
    }

    #[must_use]
    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.0.get(condition_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.values()
    }
}

impl From<Vec<Condition>> for Conditions {
    // Later entries win, which collapses duplicates written by older controllers
    fn from(list: Vec<Condition>) -> Self {
        Self(list.into_iter().map(|c| (c.r#type.clone(), c)).collect())
    }
}

impl From<Conditions> for Vec<Condition> {
    fn from(conditions: Conditions) -> Self {
        conditions.0.into_values().collect()
    }
}

/// Reason recorded on the Error condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionReason {
    ConfigRetrievalFailed,
    PostToCertApiFailed,
    GetCertDataFromCertApiFailed,
    StatusUpdateFailed,
    ParseValidToFailed,
    ParseValidFromFailed,
    SetOwnerRefFailed,
    DownloadCertFromCertApiFailed,
    DecodeCertFailed,
    CreateOrUpdateTlsSecretFailed,
}

impl ConditionReason {
    /// Wire value of the reason
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionReason::ConfigRetrievalFailed => "ConfigRetrievalFailed",
            ConditionReason::PostToCertApiFailed => "PostToCertAPIFailed",
            ConditionReason::GetCertDataFromCertApiFailed => "GetCertDataFromCertAPIFailed",
            ConditionReason::StatusUpdateFailed => "StatusUpdateFailed",
            ConditionReason::ParseValidToFailed => "ParseValidToFailed",
            ConditionReason::ParseValidFromFailed => "ParseValidFromFailed",
            ConditionReason::SetOwnerRefFailed => "SetOwnerRefFailed",
            ConditionReason::DownloadCertFromCertApiFailed => "DownloadCertFromCertAPIFailed",
            ConditionReason::DecodeCertFailed => "DecodeCertFailed",
            ConditionReason::CreateOrUpdateTlsSecretFailed => "CreateOrUpdateTLSSecretFailed",
        }
    }
}

impl std::fmt::Display for ConditionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
