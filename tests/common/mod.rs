//! Common test utilities
//!
//! - `FakeStore`: in-memory [`ClusterStore`] that assigns UIDs, generations and
//!   resourceVersions and rejects stale writes like the API server does
//! - `MockIssuanceClient` / `MockClientBuilder`: scripted Cert API
//! - fixtures for Certificates, CertificateConfigs, credentials and PKCS#12 archives

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use certificate_operator::config::ControllerConfig;
use certificate_operator::controller::reconciler::Reconciler;
use certificate_operator::controller::store::{ClusterStore, StoreError};
use certificate_operator::crd::{
    Certificate, CertificateConfig, CertificateData, CertificateSpec, ConfigReference,
};
use certificate_operator::provider::{
    CertApiError, CertificateArchive, CertificateValidity, ClientBuildError, ClientBuilder,
    Credentials, HttpError, IssuanceClient,
};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    hash::MessageDigest,
    nid::Nid,
    pkcs12::Pkcs12,
    pkey::{PKey, Private},
    rsa::Rsa,
    x509::{X509NameBuilder, X509},
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::RwLock;
use zeroize::Zeroizing;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Ignore the error if another test binary path already installed one
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub const NAMESPACE: &str = "apps";
pub const CERTIFICATE: &str = "web";
pub const SECRET_NAME: &str = "web-tls";
pub const CONFIG: &str = "cert-api";
pub const CREDENTIALS_SECRET: &str = "cert-api-credentials";
pub const CREDENTIALS_NAMESPACE: &str = "certificate-operator-system";
pub const GUID: &str = "83729jsdjd92819w1yhdsduy288yhduwdbd";
pub const ARCHIVE_PASSWORD: &str = "archive-password";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
struct State {
    certificates: HashMap<Key, Certificate>,
    configs: HashMap<String, CertificateConfig>,
    secrets: HashMap<Key, Secret>,
    next_version: u64,
    next_uid: u64,
    status_writes: usize,
    secret_writes: usize,
    /// Secret writes to reject with a conflict
    secret_conflicts: usize,
    /// Status writes to reject with a conflict, leaving the stored object alone
    status_conflicts: usize,
    /// Status writes that lose a race against another writer
    status_races: usize,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn uid(&mut self) -> String {
        self.next_uid += 1;
        format!("00000000-0000-0000-0000-{:012}", self.next_uid)
    }
}

fn conflict(what: &str) -> StoreError {
    StoreError::Conflict(format!(
        "{what}: the object has been modified; please apply your changes to the latest version and try again"
    ))
}

fn check_version(what: &str, stored: Option<&String>, incoming: Option<&String>) -> Result<(), StoreError> {
    if incoming.is_some() && stored != incoming {
        return Err(conflict(what));
    }
    Ok(())
}

/// Consume one injected failure, if any are left
fn take(remaining: &mut usize) -> bool {
    if *remaining == 0 {
        return false;
    }
    *remaining -= 1;
    true
}

/// In-memory cluster
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<RwLock<State>>,
}

impl FakeStore {
    pub async fn insert_certificate(&self, mut certificate: Certificate) -> Certificate {
        let mut state = self.state.write().await;
        if certificate.metadata.uid.is_none() {
            certificate.metadata.uid = Some(state.uid());
        }
        certificate.metadata.generation.get_or_insert(1);
        certificate.metadata.resource_version = Some(state.bump());
        let k = key(&certificate.namespace().unwrap_or_default(), &certificate.name_any());
        state.certificates.insert(k, certificate.clone());
        certificate
    }

    pub async fn insert_config(&self, mut config: CertificateConfig) {
        let mut state = self.state.write().await;
        config.metadata.resource_version = Some(state.bump());
        state.configs.insert(config.name_any(), config);
    }

    pub async fn insert_secret(&self, mut secret: Secret) {
        let mut state = self.state.write().await;
        secret.metadata.resource_version = Some(state.bump());
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        state.secrets.insert(k, secret);
    }

    /// Edit a stored Certificate in place, as a user would with `kubectl edit`.
    ///
    /// The generation moves only when the spec changed.
    pub async fn edit_certificate<F: FnOnce(&mut Certificate)>(&self, namespace: &str, name: &str, edit: F) {
        let mut state = self.state.write().await;
        let version = state.bump();
        let certificate = state
            .certificates
            .get_mut(&key(namespace, name))
            .expect("certificate to edit exists");
        let spec = certificate.spec.clone();
        edit(certificate);
        if certificate.spec != spec {
            certificate.metadata.generation = Some(certificate.metadata.generation.unwrap_or(0) + 1);
        }
        certificate.metadata.resource_version = Some(version);
    }

    /// Reject the next Secret create or replace with a conflict
    pub async fn conflict_next_secret_write(&self) {
        self.state.write().await.secret_conflicts += 1;
    }

    /// Reject the next Certificate status write with a conflict
    pub async fn conflict_next_status_write(&self) {
        self.state.write().await.status_conflicts += 1;
    }

    /// Let another writer update the Certificate right before the next
    /// status write, so that write carries a stale resourceVersion
    pub async fn race_next_status_write(&self) {
        self.state.write().await.status_races += 1;
    }

    pub async fn edit_config<F: FnOnce(&mut CertificateConfig)>(&self, name: &str, edit: F) {
        let mut state = self.state.write().await;
        let version = state.bump();
        let config = state.configs.get_mut(name).expect("config to edit exists");
        edit(config);
        config.metadata.resource_version = Some(version);
    }

    pub async fn delete_secret(&self, namespace: &str, name: &str) {
        self.state.write().await.secrets.remove(&key(namespace, name));
    }

    pub async fn certificate(&self, namespace: &str, name: &str) -> Certificate {
        self.state.read().await.certificates[&key(namespace, name)].clone()
    }

    pub async fn config(&self, name: &str) -> Option<CertificateConfig> {
        self.state.read().await.configs.get(name).cloned()
    }

    pub async fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state.read().await.secrets.get(&key(namespace, name)).cloned()
    }

    pub async fn status_writes(&self) -> usize {
        self.state.read().await.status_writes
    }

    pub async fn secret_writes(&self) -> usize {
        self.state.read().await.secret_writes
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn get_certificate(&self, namespace: &str, name: &str) -> Result<Certificate, StoreError> {
        self.state
            .read()
            .await
            .certificates
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Certificate {namespace}/{name}")))
    }

    async fn get_certificate_config(&self, name: &str) -> Result<CertificateConfig, StoreError> {
        self.state
            .read()
            .await
            .configs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("CertificateConfig {name}")))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        self.state
            .read()
            .await
            .secrets
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Secret {namespace}/{name}")))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let mut state = self.state.write().await;
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        if take(&mut state.secret_conflicts) {
            return Err(conflict("Secret"));
        }
        if state.secrets.contains_key(&k) {
            return Err(StoreError::Conflict(format!("Secret {}/{} already exists", k.0, k.1)));
        }
        let mut created = secret.clone();
        created.metadata.resource_version = Some(state.bump());
        state.secrets.insert(k, created.clone());
        state.secret_writes += 1;
        Ok(created)
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let mut state = self.state.write().await;
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        if take(&mut state.secret_conflicts) {
            return Err(conflict("Secret"));
        }
        let stored = state
            .secrets
            .get(&k)
            .ok_or_else(|| StoreError::NotFound(format!("Secret {}/{}", k.0, k.1)))?;
        check_version(
            "Secret",
            stored.metadata.resource_version.as_ref(),
            secret.metadata.resource_version.as_ref(),
        )?;
        let mut replaced = secret.clone();
        replaced.metadata.resource_version = Some(state.bump());
        state.secrets.insert(k, replaced.clone());
        state.secret_writes += 1;
        Ok(replaced)
    }

    async fn replace_certificate_status(&self, certificate: &Certificate) -> Result<Certificate, StoreError> {
        let mut state = self.state.write().await;
        let k = key(&certificate.namespace().unwrap_or_default(), &certificate.name_any());
        if take(&mut state.status_conflicts) {
            return Err(conflict("Certificate"));
        }
        if take(&mut state.status_races) {
            let version = state.bump();
            if let Some(stored) = state.certificates.get_mut(&k) {
                stored.metadata.resource_version = Some(version);
            }
        }
        let stored_version = state
            .certificates
            .get(&k)
            .ok_or_else(|| StoreError::NotFound(format!("Certificate {}/{}", k.0, k.1)))?
            .metadata
            .resource_version
            .clone();
        check_version(
            "Certificate",
            stored_version.as_ref(),
            certificate.metadata.resource_version.as_ref(),
        )?;

        let version = state.bump();
        state.status_writes += 1;
        let stored = state.certificates.get_mut(&k).expect("checked above");
        stored.status.clone_from(&certificate.status);
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn list_certificates_for_config(&self, config_name: &str) -> Result<Vec<Certificate>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .certificates
            .values()
            .filter(|c| c.spec.config_ref.name == config_name)
            .cloned()
            .collect())
    }

    async fn replace_certificate_config(&self, config: &CertificateConfig) -> Result<CertificateConfig, StoreError> {
        let mut state = self.state.write().await;
        let name = config.name_any();
        let stored = state
            .configs
            .get(&name)
            .ok_or_else(|| StoreError::NotFound(format!("CertificateConfig {name}")))?;
        check_version(
            "CertificateConfig",
            stored.metadata.resource_version.as_ref(),
            config.metadata.resource_version.as_ref(),
        )?;

        let mut replaced = config.clone();
        replaced.metadata.resource_version = Some(state.bump());
        // The API server deletes a terminating object once its last finalizer is gone
        if replaced.metadata.deletion_timestamp.is_some() && replaced.finalizers().is_empty() {
            state.configs.remove(&name);
        } else {
            state.configs.insert(name, replaced.clone());
        }
        Ok(replaced)
    }
}

/// What the scripted Cert API answers
#[derive(Clone)]
pub struct MockBehaviour {
    pub guid: String,
    pub valid_to: String,
    pub valid_from: String,
    pub signature_hash_algorithm: String,
    pub archive_data: String,
    pub archive_password: String,
    /// Status text returned instead of a guid
    pub issue_status: Option<String>,
    /// Status text returned instead of the validity
    pub validity_status: Option<String>,
    /// Status text returned instead of the archive
    pub download_status: Option<String>,
}

/// Scripted [`IssuanceClient`] counting its calls
pub struct MockIssuanceClient {
    pub behaviour: Mutex<MockBehaviour>,
    pub issue_calls: AtomicUsize,
    pub validity_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl MockIssuanceClient {
    pub fn new(behaviour: MockBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Mutex::new(behaviour),
            issue_calls: AtomicUsize::new(0),
            validity_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        })
    }

    pub fn update<F: FnOnce(&mut MockBehaviour)>(&self, change: F) {
        change(&mut self.behaviour.lock().unwrap());
    }

    pub fn issue_calls(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    pub fn validity_calls(&self) -> usize {
        self.validity_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.issue_calls() + self.validity_calls() + self.download_calls()
    }

    fn behaviour(&self) -> MockBehaviour {
        self.behaviour.lock().unwrap().clone()
    }
}

fn status_error(status: String) -> HttpError {
    HttpError::Status(status)
}

#[async_trait]
impl IssuanceClient for MockIssuanceClient {
    async fn issue(&self, _data: &CertificateData) -> Result<String, CertApiError> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour();
        match behaviour.issue_status {
            Some(status) => Err(CertApiError::Post(status_error(status))),
            None => Ok(behaviour.guid),
        }
    }

    async fn fetch_validity(&self, _guid: &str) -> Result<CertificateValidity, CertApiError> {
        self.validity_calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour();
        match behaviour.validity_status {
            Some(status) => Err(CertApiError::Get(status_error(status))),
            None => Ok(CertificateValidity {
                valid_to: behaviour.valid_to,
                valid_from: behaviour.valid_from,
                signature_hash_algorithm: behaviour.signature_hash_algorithm,
            }),
        }
    }

    async fn download(&self, _guid: &str, form: &str) -> Result<CertificateArchive, CertApiError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour();
        match behaviour.download_status {
            Some(status) => Err(CertApiError::Download(status_error(status))),
            None => Ok(CertificateArchive {
                form: form.to_string(),
                format: "pkcs12".to_string(),
                data: behaviour.archive_data,
                password: Zeroizing::new(behaviour.archive_password),
            }),
        }
    }
}

/// Validates credentials and the wait timeout like the real builder, then hands out the mock
pub struct MockClientBuilder {
    pub client: Arc<MockIssuanceClient>,
}

impl ClientBuilder for MockClientBuilder {
    fn build(
        &self,
        config: &CertificateConfig,
        secret_data: Option<&BTreeMap<String, ByteString>>,
    ) -> Result<Arc<dyn IssuanceClient>, ClientBuildError> {
        Credentials::from_secret_data(secret_data)?;
        config.spec.wait_timeout()?;
        Ok(Arc::clone(&self.client) as Arc<dyn IssuanceClient>)
    }
}

/// Format a timestamp the way the Cert API does
pub fn cert_api_time(time: chrono::DateTime<chrono::Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn self_signed(pkey: &PKey<Private>) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "web.example.com")
        .unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(pkey, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Base64 PKCS#12 archive holding a fresh RSA key and self-signed certificate
pub fn rsa_archive(password: &str) -> String {
    let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    let cert = self_signed(&pkey);
    let der = Pkcs12::builder()
        .name("web")
        .pkey(&pkey)
        .cert(&cert)
        .build2(password)
        .and_then(|p12| p12.to_der())
        .unwrap();
    general_purpose::STANDARD.encode(der)
}

/// Behaviour of a healthy Cert API issuing a one-year certificate
pub fn healthy_behaviour() -> MockBehaviour {
    let now = chrono::Utc::now();
    MockBehaviour {
        guid: GUID.to_string(),
        valid_to: cert_api_time(now + chrono::Duration::days(365)),
        valid_from: cert_api_time(now),
        signature_hash_algorithm: "sha384".to_string(),
        archive_data: rsa_archive(ARCHIVE_PASSWORD),
        archive_password: ARCHIVE_PASSWORD.to_string(),
        issue_status: None,
        validity_status: None,
        download_status: None,
    }
}

pub fn certificate() -> Certificate {
    let mut certificate = Certificate::new(
        CERTIFICATE,
        CertificateSpec {
            secret_name: SECRET_NAME.to_string(),
            config_ref: ConfigReference {
                name: CONFIG.to_string(),
            },
            ..CertificateSpec::default()
        },
    );
    certificate.metadata.namespace = Some(NAMESPACE.to_string());
    certificate.spec.certificate_data.subject.common_name = "web.example.com".to_string();
    certificate.spec.certificate_data.san.dns = vec!["web.example.com".to_string()];
    certificate.spec.certificate_data.template = "web-server".to_string();
    certificate
}

pub fn certificate_config() -> CertificateConfig {
    serde_json::from_value(json!({
        "apiVersion": "cert.dana.io/v1alpha1",
        "kind": "CertificateConfig",
        "metadata": { "name": CONFIG },
        "spec": {
            "secretRef": { "name": CREDENTIALS_SECRET, "namespace": CREDENTIALS_NAMESPACE },
            "daysBeforeRenewal": 7,
            "waitTimeout": "30s"
        }
    }))
    .unwrap()
}

pub fn credentials_secret(credentials: serde_json::Value) -> Secret {
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": CREDENTIALS_SECRET, "namespace": CREDENTIALS_NAMESPACE },
        "data": {
            "credentials": general_purpose::STANDARD.encode(credentials.to_string())
        }
    }))
    .unwrap()
}

pub fn valid_credentials() -> serde_json::Value {
    json!({
        "apiEndpoint": "https://cert-api.example.com/api/v1/certificates/",
        "downloadEndpoint": "/download/",
        "token": "jwt-test"
    })
}

/// Everything a Certificate reconcile needs, wired to the fakes
pub struct Harness {
    pub store: FakeStore,
    pub client: Arc<MockIssuanceClient>,
    pub ctx: Arc<Reconciler>,
}

impl Harness {
    pub async fn new(behaviour: MockBehaviour) -> Self {
        let harness = Self::empty(behaviour);
        harness.store.insert_config(certificate_config()).await;
        harness
            .store
            .insert_secret(credentials_secret(valid_credentials()))
            .await;
        harness.store.insert_certificate(certificate()).await;
        harness
    }

    /// Fakes without any objects
    pub fn empty(behaviour: MockBehaviour) -> Self {
        let store = FakeStore::default();
        let client = MockIssuanceClient::new(behaviour);
        let ctx = Arc::new(Reconciler::new(
            Arc::new(store.clone()),
            Arc::new(MockClientBuilder {
                client: Arc::clone(&client),
            }),
            ControllerConfig::default(),
        ));
        Self { store, client, ctx }
    }

    pub async fn stored_certificate(&self) -> Certificate {
        self.store.certificate(NAMESPACE, CERTIFICATE).await
    }
}
