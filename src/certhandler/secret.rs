//! # Secret Materializer
//!
//! Builds the `kubernetes.io/tls` Secret for a Certificate, attaches the
//! owner reference and upserts it.

use crate::certhandler::decoder::TlsMaterial;
use crate::controller::store::{ClusterStore, StoreError};
use crate::crd::Certificate;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";
pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

#[derive(Debug, thiserror::Error)]
pub enum OwnerRefError {
    #[error(
        "cross-namespace owner references are disallowed, owner's namespace {owner_namespace}, obj's namespace {object_namespace}"
    )]
    CrossNamespace {
        owner_namespace: String,
        object_namespace: String,
    },
    #[error("owner {0} has no UID")]
    MissingUid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("cannot create secret {name:?} in the namespace {namespace:?}: {source}")]
    Create {
        name: String,
        namespace: String,
        source: StoreError,
    },
    #[error("cannot get secret {name:?} in the namespace {namespace:?}: {source}")]
    Get {
        name: String,
        namespace: String,
        source: StoreError,
    },
    #[error("cannot update secret {name:?} in the namespace {namespace:?}: {source}")]
    Update {
        name: String,
        namespace: String,
        source: StoreError,
    },
}

/// Build the TLS Secret for `certificate` in `namespace`
#[must_use]
pub fn tls_secret(material: &TlsMaterial, certificate: &Certificate, namespace: &str) -> Secret {
    let data = BTreeMap::from([
        (
            TLS_CERT_KEY.to_string(),
            ByteString(material.certificate.clone()),
        ),
        (
            TLS_PRIVATE_KEY_KEY.to_string(),
            ByteString(material.private_key.to_vec()),
        ),
    ]);

    Secret {
        metadata: ObjectMeta {
            name: Some(certificate.spec.secret_name.clone()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        type_: Some(SECRET_TYPE_TLS.to_string()),
        data: Some(data),
        ..Secret::default()
    }
}

/// Add an owner reference from `secret` to `owner`.
///
/// Owner and object must share a namespace. An existing reference to the
/// same owner UID is replaced rather than duplicated.
pub fn set_owner_reference(owner: &Certificate, secret: &mut Secret) -> Result<(), OwnerRefError> {
    let owner_namespace = owner.namespace().unwrap_or_default();
    let object_namespace = secret.namespace().unwrap_or_default();
    if owner_namespace != object_namespace {
        return Err(OwnerRefError::CrossNamespace {
            owner_namespace,
            object_namespace,
        });
    }

    let uid = owner
        .uid()
        .ok_or_else(|| OwnerRefError::MissingUid(owner.name_any()))?;

    let reference = OwnerReference {
        api_version: Certificate::api_version(&()).into_owned(),
        kind: Certificate::kind(&()).into_owned(),
        name: owner.name_any(),
        uid,
        controller: None,
        block_owner_deletion: None,
    };

    let references = secret.metadata.owner_references.get_or_insert_with(Vec::new);
    match references.iter_mut().find(|r| r.uid == reference.uid) {
        Some(existing) => *existing = reference,
        None => references.push(reference),
    }
    Ok(())
}

/// Create the secret, or overwrite only the data of an existing one.
///
/// Labels, annotations and other fields of an existing secret are left as they are.
pub async fn create_or_update_tls_secret(
    store: &dyn ClusterStore,
    secret: &Secret,
) -> Result<Secret, SecretError> {
    let name = secret.name_any();
    let namespace = secret.namespace().unwrap_or_default();

    match store.get_secret(&namespace, &name).await {
        Ok(mut existing) => {
            existing.data.clone_from(&secret.data);
            let updated = store
                .replace_secret(&existing)
                .await
                .map_err(|source| SecretError::Update {
                    name: name.clone(),
                    namespace: namespace.clone(),
                    source,
                })?;
            debug!(secret = %name, namespace = %namespace, "Updated TLS secret data");
            Ok(updated)
        }
        Err(e) if e.is_not_found() => {
            let created = store
                .create_secret(secret)
                .await
                .map_err(|source| SecretError::Create {
                    name: name.clone(),
                    namespace: namespace.clone(),
                    source,
                })?;
            info!(secret = %name, namespace = %namespace, "Created TLS secret");
            Ok(created)
        }
        Err(source) => Err(SecretError::Get {
            name,
            namespace,
            source,
        }),
    }
}
