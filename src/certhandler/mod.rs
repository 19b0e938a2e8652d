//! # Certificate Handling
//!
//! - `decoder.rs` - PKCS#12 archive to PEM material
//! - `secret.rs` - TLS Secret construction, ownership and upsert

pub mod decoder;
pub mod secret;

pub use decoder::{decode, DecodeError, TlsMaterial};
pub use secret::{
    create_or_update_tls_secret, set_owner_reference, tls_secret, OwnerRefError, SecretError,
    TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY,
};
