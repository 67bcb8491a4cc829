use serde::Deserialize;

use super::common::EncryptedResource;

#[derive(Debug, Clone, Deserialize)]
pub struct CertificatesResponse {
    pub data: Vec<CertificateEntry>,
}

/// One platform certificate as delivered by `/v3/certificates`. The
/// `certificate` field is absent on the wire; the client fills it with the
/// decrypted PEM.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateEntry {
    pub serial_no: String,
    pub effective_time: String,
    pub expire_time: String,
    pub encrypt_certificate: EncryptedResource,
    #[serde(default)]
    pub certificate: Option<String>,
}
