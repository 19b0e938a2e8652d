//! # Cluster Store
//!
//! Every read and write the reconcilers make against the cluster goes
//! through [`ClusterStore`]. The production implementation wraps
//! `kube::Api`; tests swap in an in-memory store.
//!
//! Writes carry the object's `resourceVersion`, so a stale write fails with
//! [`StoreError::Conflict`] and is retried like any other error.

use crate::crd::{Certificate, CertificateConfig};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{ListParams, Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{0}")]
    Kube(#[source] kube::Error),
    #[error("failed to serialize {0}: {1}")]
    Serialize(String, #[source] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    fn from_kube(what: String, error: kube::Error) -> Self {
        match &error {
            kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound(what),
            kube::Error::Api(api_err) if api_err.code == 409 => {
                StoreError::Conflict(format!("{what}: {}", api_err.message))
            }
            _ => StoreError::Kube(error),
        }
    }
}

#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_certificate(&self, namespace: &str, name: &str)
        -> Result<Certificate, StoreError>;

    async fn get_certificate_config(&self, name: &str) -> Result<CertificateConfig, StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;

    /// Replace an existing Secret. The secret's resourceVersion must be current.
    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;

    /// Write the status subresource of a Certificate and return the stored object.
    async fn replace_certificate_status(
        &self,
        certificate: &Certificate,
    ) -> Result<Certificate, StoreError>;

    /// All Certificates, in any namespace, whose `configRef.name` equals `config_name`
    async fn list_certificates_for_config(
        &self,
        config_name: &str,
    ) -> Result<Vec<Certificate>, StoreError>;

    async fn replace_certificate_config(
        &self,
        config: &CertificateConfig,
    ) -> Result<CertificateConfig, StoreError>;
}

/// [`ClusterStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn certificates(&self, namespace: &str) -> Api<Certificate> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn describe(kind: &str, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{kind} {ns}/{name}"),
        None => format!("{kind} {name}"),
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_certificate(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Certificate, StoreError> {
        self.certificates(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(describe("Certificate", Some(namespace), name), e))
    }

    async fn get_certificate_config(&self, name: &str) -> Result<CertificateConfig, StoreError> {
        let api: Api<CertificateConfig> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(describe("CertificateConfig", None, name), e))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        self.secrets(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(describe("Secret", Some(namespace), name), e))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let namespace = secret.namespace().unwrap_or_default();
        self.secrets(&namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| {
                StoreError::from_kube(describe("Secret", Some(&namespace), &secret.name_any()), e)
            })
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let namespace = secret.namespace().unwrap_or_default();
        let name = secret.name_any();
        self.secrets(&namespace)
            .replace(&name, &PostParams::default(), secret)
            .await
            .map_err(|e| StoreError::from_kube(describe("Secret", Some(&namespace), &name), e))
    }

    async fn replace_certificate_status(
        &self,
        certificate: &Certificate,
    ) -> Result<Certificate, StoreError> {
        let namespace = certificate.namespace().unwrap_or_default();
        let name = certificate.name_any();
        let what = describe("Certificate", Some(&namespace), &name);

        let status = serde_json::to_value(&certificate.status)
            .map_err(|e| StoreError::Serialize(what.clone(), e))?;
        // resourceVersion in a merge patch is a precondition, stale writes get a 409
        let patch = json!({
            "metadata": { "resourceVersion": certificate.resource_version() },
            "status": status,
        });

        self.certificates(&namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| StoreError::from_kube(what, e))
    }

    async fn list_certificates_for_config(
        &self,
        config_name: &str,
    ) -> Result<Vec<Certificate>, StoreError> {
        let api: Api<Certificate> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| StoreError::from_kube("Certificates".to_string(), e))?;

        Ok(list
            .items
            .into_iter()
            .filter(|c| c.spec.config_ref.name == config_name)
            .collect())
    }

    async fn replace_certificate_config(
        &self,
        config: &CertificateConfig,
    ) -> Result<CertificateConfig, StoreError> {
        let name = config.name_any();
        let api: Api<CertificateConfig> = Api::all(self.client.clone());
        api.replace(&name, &PostParams::default(), config)
            .await
            .map_err(|e| StoreError::from_kube(describe("CertificateConfig", None, &name), e))
    }
}
