//! # Issuance Operations
//!
//! [`IssuanceClient`] for the Cert API REST client: issue, fetch validity
//! and download.

use crate::crd::CertificateData;
use crate::observability::metrics;
use crate::provider::IssuanceClient;
use async_trait::async_trait;
use reqwest::Method;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::{
    parse_response_body, CertApiClient, CertApiError, CertificateArchive, CertificateValidity,
    CreateCertificateRequest, CreateCertificateResponse,
};

fn record<T>(operation: &str, started: Instant, result: &Result<T, CertApiError>) {
    metrics::record_cert_api_operation(
        operation,
        result.is_ok(),
        started.elapsed().as_secs_f64(),
    );
}

#[async_trait]
impl IssuanceClient for CertApiClient {
    async fn issue(&self, data: &CertificateData) -> Result<String, CertApiError> {
        let span = info_span!("cert_api.issue", common_name = %data.subject.common_name);
        async move {
            let started = Instant::now();
            let body = serde_json::to_value(CreateCertificateRequest::from(data))
                .map_err(CertApiError::Encode)?;

            let result = match self.send(Method::POST, &self.create_url(), Some(&body)).await {
                Ok(text) => parse_response_body::<CreateCertificateResponse>(&text)
                    .map(|r| r.guid)
                    .map_err(CertApiError::Body),
                Err(e) => Err(CertApiError::Post(e)),
            };
            record("issue", started, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn fetch_validity(&self, guid: &str) -> Result<CertificateValidity, CertApiError> {
        let span = info_span!("cert_api.fetch_validity", guid = %guid);
        async move {
            let started = Instant::now();
            let result = match self.send(Method::GET, &self.validity_url(guid), None).await {
                Ok(text) => parse_response_body(&text).map_err(CertApiError::Body),
                Err(e) => Err(CertApiError::Get(e)),
            };
            record("fetch_validity", started, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn download(&self, guid: &str, form: &str) -> Result<CertificateArchive, CertApiError> {
        let span = info_span!("cert_api.download", guid = %guid, form = %form);
        async move {
            let started = Instant::now();
            let result = match self
                .send(Method::GET, &self.download_url(guid, form), None)
                .await
            {
                Ok(text) => parse_response_body(&text).map_err(CertApiError::Body),
                Err(e) => Err(CertApiError::Download(e)),
            };
            record("download", started, &result);
            result
        }
        .instrument(span)
        .await
    }
}
