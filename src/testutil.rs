//! Shared fixtures and helpers for the crate's tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;

use crate::cert::store::PlatformCert;
use crate::client::ClientCore;
use crate::config::{Config, ConfigStore};
use crate::crypto::pem;
use crate::crypto::sign::sign_sha256_rsa;
use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

pub(crate) const MERCHANT_KEY_PEM: &str = include_str!("../tests/fixtures/merchant_key.pem");
pub(crate) const MERCHANT_CERT_PEM: &str = include_str!("../tests/fixtures/merchant_cert.pem");
pub(crate) const PLATFORM_KEY_PEM: &str = include_str!("../tests/fixtures/platform_key.pem");
pub(crate) const PLATFORM_CERT_PEM: &str = include_str!("../tests/fixtures/platform_cert.pem");

pub(crate) const API_V3_KEY: &str = "0123456789abcdef0123456789abcdef";
pub(crate) const PLATFORM_SERIAL: &str = "PLAT_SERIAL_1";
pub(crate) const MERCHANT_SERIAL: &str = "MCHSERIAL001";

/// Queue-backed transport: pops one canned response per exchange and records
/// every request it sees. An empty queue fails the exchange.
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub(crate) fn new(responses: Vec<TransportResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(&self, req: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(req);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Failed("no canned response queued".into()))
    }
}

pub(crate) fn test_config(transport: Arc<MockTransport>) -> Config {
    Config::builder()
        .app_id("wx8888888888888888")
        .mch_id("1900000001")
        .notify_url("https://merchant.example.com/notify")
        .api_v3_key(API_V3_KEY)
        .merchant_serial(MERCHANT_SERIAL)
        .merchant_private_key_pem(MERCHANT_KEY_PEM)
        .merchant_certificate_pem(MERCHANT_CERT_PEM)
        .transport_arc(transport)
        .build()
        .unwrap()
}

pub(crate) fn test_config_with_certs(transport: Arc<MockTransport>) -> Config {
    let store = ConfigStore::new(test_config(transport));
    store.update_certificates(vec![platform_cert()]);
    (*store.snapshot()).clone()
}

pub(crate) fn test_core(
    responses: Vec<TransportResponse>,
) -> (Arc<ClientCore>, Arc<MockTransport>) {
    let transport = MockTransport::new(responses);
    let core = Arc::new(ClientCore {
        store: ConfigStore::new(test_config(Arc::clone(&transport))),
        refresh_gate: tokio::sync::Mutex::new(()),
    });
    (core, transport)
}

pub(crate) fn test_core_with_certs(
    transport: Arc<MockTransport>,
) -> (Arc<ClientCore>, Arc<Config>) {
    let core = Arc::new(ClientCore {
        store: ConfigStore::new(test_config_with_certs(transport)),
        refresh_gate: tokio::sync::Mutex::new(()),
    });
    let config = core.store.snapshot();
    (core, config)
}

pub(crate) fn platform_signing_key() -> SigningKey<Sha256> {
    SigningKey::<Sha256>::new(pem::parse_private_key(PLATFORM_KEY_PEM).unwrap())
}

pub(crate) fn platform_cert() -> PlatformCert {
    platform_cert_with_serial(PLATFORM_SERIAL)
}

pub(crate) fn platform_cert_with_serial(serial: &str) -> PlatformCert {
    PlatformCert::from_pem(
        serial,
        "2024-01-01T00:00:00+08:00",
        "2029-01-01T00:00:00+08:00",
        PLATFORM_CERT_PEM,
    )
    .unwrap()
}

/// A 2xx/other response carrying valid `Wechatpay-*` signature headers over
/// `body`, signed with the platform fixture key.
pub(crate) fn signed_response(status: u16, body: &str) -> TransportResponse {
    let timestamp = crate::client::current_timestamp().to_string();
    let nonce = "mocknonce123";
    let message = format!("{timestamp}\n{nonce}\n{body}\n");
    let signature = sign_sha256_rsa(&platform_signing_key(), &message);

    TransportResponse {
        status,
        headers: vec![
            ("Wechatpay-Serial".to_string(), PLATFORM_SERIAL.to_string()),
            ("Wechatpay-Timestamp".to_string(), timestamp),
            ("Wechatpay-Nonce".to_string(), nonce.to_string()),
            ("Wechatpay-Signature".to_string(), signature),
            ("Content-Type".to_string(), "application/json".to_string()),
        ],
        body: body.as_bytes().to_vec(),
    }
}

/// A response with no signature headers at all.
pub(crate) fn plain_response(status: u16, body: &str) -> TransportResponse {
    TransportResponse {
        status,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

/// AES-256-GCM seal, returning base64(ciphertext||tag).
pub(crate) fn seal(key: &str, nonce: &str, aad: &str, plaintext: &[u8]) -> String {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).unwrap();
    let gcm_nonce = Nonce::from_slice(nonce.as_bytes());
    let sealed = cipher
        .encrypt(
            gcm_nonce,
            Payload {
                msg: plaintext,
                aad: aad.as_bytes(),
            },
        )
        .unwrap();
    BASE64.encode(sealed)
}

/// Canned `/v3/certificates` body whose single entry opens to the platform
/// fixture certificate.
pub(crate) fn certificates_body() -> String {
    let ciphertext = seal(API_V3_KEY, "0123456789ab", "certificate", PLATFORM_CERT_PEM.as_bytes());
    serde_json::json!({
        "data": [{
            "serial_no": PLATFORM_SERIAL,
            "effective_time": "2024-01-01T00:00:00+08:00",
            "expire_time": "2029-01-01T00:00:00+08:00",
            "encrypt_certificate": {
                "algorithm": "AEAD_AES_256_GCM",
                "nonce": "0123456789ab",
                "associated_data": "certificate",
                "ciphertext": ciphertext,
            }
        }]
    })
    .to_string()
}

pub(crate) fn certificates_response(signed: bool) -> TransportResponse {
    let body = certificates_body();
    if signed {
        signed_response(200, &body)
    } else {
        plain_response(200, &body)
    }
}

pub(crate) struct AuthFields {
    pub mchid: String,
    pub nonce_str: String,
    pub timestamp: String,
    pub serial_no: String,
    pub signature: String,
}

/// Parse an APIv3 Authorization header, asserting the scheme and the
/// mandated field order.
pub(crate) fn parse_authorization(header: &str) -> AuthFields {
    const SCHEME: &str = "WECHATPAY2-SHA256-RSA2048 ";
    assert!(header.starts_with(SCHEME), "unexpected scheme: {header}");
    let rest = &header[SCHEME.len()..];

    let field = |name: &str| -> String {
        let marker = format!("{name}=\"");
        let start = rest.find(&marker).unwrap_or_else(|| panic!("missing {name}")) + marker.len();
        let end = rest[start..].find('"').unwrap() + start;
        rest[start..end].to_string()
    };

    let mut last = 0;
    for name in ["mchid", "nonce_str", "timestamp", "serial_no", "signature"] {
        let pos = rest.find(&format!("{name}=\"")).unwrap_or_else(|| panic!("missing {name}"));
        assert!(pos >= last, "field {name} out of order in {header}");
        last = pos;
    }

    AuthFields {
        mchid: field("mchid"),
        nonce_str: field("nonce_str"),
        timestamp: field("timestamp"),
        serial_no: field("serial_no"),
        signature: field("signature"),
    }
}

/// Check a base64 signature against the merchant fixture key.
pub(crate) fn merchant_signature_valid(message: &str, signature_base64: &str) -> bool {
    let private = pem::parse_private_key(MERCHANT_KEY_PEM).unwrap();
    let verifying = VerifyingKey::<Sha256>::new(RsaPublicKey::from(&private));
    let bytes = match BASE64.decode(signature_base64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = match rsa::pkcs1v15::Signature::try_from(bytes.as_slice()) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    verifying.verify(message.as_bytes(), &signature).is_ok()
}
