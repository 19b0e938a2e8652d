//! # Request Types
//!
//! Body of `POST {apiEndpoint}`, the certificate creation request.

use crate::crd::CertificateData;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateCertificateRequest {
    pub subject: SubjectRequest,
    pub san: SanRequest,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub template: String,
}

/// Note the Cert API spells the unit field `organizationalUnit`, unlike the CRD
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub common_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub locality: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub organization: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub organizational_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,
}

impl From<&CertificateData> for CreateCertificateRequest {
    fn from(data: &CertificateData) -> Self {
        let subject = &data.subject;
        Self {
            subject: SubjectRequest {
                common_name: subject.common_name.clone(),
                country: subject.country.clone(),
                state: subject.state.clone(),
                locality: subject.locality.clone(),
                organization: subject.organization.clone(),
                organizational_unit: subject.organization_unit.clone(),
            },
            san: SanRequest {
                dns: data.san.dns.clone(),
                ips: data.san.ips.clone(),
            },
            template: data.template.clone(),
        }
    }
}
