use std::collections::HashMap;

use rsa::pkcs1v15::VerifyingKey;
use rsa::sha2::Sha256;
use rsa::RsaPublicKey;

use crate::crypto::pem;
use crate::error::WxPayError;

/// A platform certificate resolved to its verification material.
#[derive(Clone)]
pub struct PlatformCert {
    pub serial_no: String,
    pub effective_time: String,
    pub expire_time: String,
    pub public_key: RsaPublicKey,
    pub verifying_key: VerifyingKey<Sha256>,
    pub certificate_pem: String,
}

impl PlatformCert {
    /// Build a platform certificate from a decrypted PEM. The serial is the
    /// one advertised alongside the payload; validity strings are carried
    /// verbatim.
    pub fn from_pem(
        serial_no: impl Into<String>,
        effective_time: impl Into<String>,
        expire_time: impl Into<String>,
        certificate_pem: impl Into<String>,
    ) -> Result<Self, WxPayError> {
        let certificate_pem = certificate_pem.into();
        let public_key = pem::public_key_from_cert_pem(&certificate_pem)?;
        let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
        Ok(Self {
            serial_no: serial_no.into(),
            effective_time: effective_time.into(),
            expire_time: expire_time.into(),
            public_key,
            verifying_key,
            certificate_pem,
        })
    }
}

/// Platform certificates keyed by serial number. The store is an immutable
/// value inside a configuration snapshot; replacement happens by snapshot
/// substitution, so lookups never take a lock.
#[derive(Clone, Default)]
pub struct CertStore {
    certs: HashMap<String, PlatformCert>,
}

impl CertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding exactly the given certificates. Duplicate
    /// serials collapse to the last entry.
    pub fn from_certs(certs: Vec<PlatformCert>) -> Self {
        let mut map = HashMap::with_capacity(certs.len());
        for cert in certs {
            map.insert(cert.serial_no.clone(), cert);
        }
        Self { certs: map }
    }

    pub fn get(&self, serial_no: &str) -> Option<&PlatformCert> {
        self.certs.get(serial_no)
    }

    pub fn insert(&mut self, cert: PlatformCert) {
        self.certs.insert(cert.serial_no.clone(), cert);
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn serials(&self) -> impl Iterator<Item = &str> {
        self.certs.keys().map(String::as_str)
    }
}
