//! # Archive Decoder
//!
//! Turns the base64-encoded, password-protected PKCS#12 archive returned by
//! the Cert API into PEM certificate and private key bytes.

use base64::{engine::general_purpose, Engine as _};
use openssl::{error::ErrorStack, pkcs12::Pkcs12, pkey::Id};
use zeroize::Zeroizing;

/// PEM-encoded certificate and private key
///
/// The private key is wiped from memory when dropped and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub certificate: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certificate_len", &self.certificate.len())
            .field("private_key_len", &self.private_key.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("cannot decode base64-encoded PKCS#12 data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cannot decode PKCS#12 data: {0}")]
    Pkcs12(#[source] ErrorStack),
    #[error("cannot decode PKCS#12 data: archive holds no private key")]
    MissingKey,
    #[error("cannot decode PKCS#12 data: archive holds no certificate")]
    MissingCertificate,
    #[error("cannot cast to RSA Private Key")]
    CastError,
    #[error("cannot encode PEM: {0}")]
    Pem(#[source] ErrorStack),
}

/// Decode a base64 PKCS#12 archive into PEM material.
///
/// The certificate is encoded as a `CERTIFICATE` block and the key as a
/// PKCS#1 `RSA PRIVATE KEY` block. Only RSA keys are accepted.
pub fn decode(data: &str, password: &str) -> Result<TlsMaterial, DecodeError> {
    let der = Zeroizing::new(general_purpose::STANDARD.decode(data.trim())?);

    let parsed = Pkcs12::from_der(&der)
        .and_then(|archive| archive.parse2(password))
        .map_err(DecodeError::Pkcs12)?;

    let pkey = parsed.pkey.ok_or(DecodeError::MissingKey)?;
    let cert = parsed.cert.ok_or(DecodeError::MissingCertificate)?;

    if pkey.id() != Id::RSA {
        return Err(DecodeError::CastError);
    }
    let rsa = pkey.rsa().map_err(|_| DecodeError::CastError)?;

    let certificate = cert.to_pem().map_err(DecodeError::Pem)?;
    let private_key = Zeroizing::new(rsa.private_key_to_pem().map_err(DecodeError::Pem)?);

    Ok(TlsMaterial {
        certificate,
        private_key,
    })
}
