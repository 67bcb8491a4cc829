use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rsa::pkcs1v15::SigningKey;
use rsa::sha2::Sha256;
use rsa::RsaPrivateKey;
use tracing::Level;
use x509_cert::Certificate;

use crate::cert::store::{CertStore, PlatformCert};
use crate::codec::{JsonCodec, SerdeJsonCodec};
use crate::crypto::pem;
use crate::crypto::sign::sign_sha256_rsa;
use crate::error::WxPayError;
use crate::transport::{ReqwestTransport, Transport};

pub const DEFAULT_SERVICE_HOST: &str = "api.mch.weixin.qq.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

const SIGN_PROBE: &str = "signing probe";

/// Immutable validated configuration snapshot.
///
/// Snapshots are shared behind `Arc` and replaced wholesale by the
/// [`ConfigStore`]; a request takes one snapshot at entry and uses it
/// throughout, so configuration can never change mid-request.
#[derive(Clone)]
pub struct Config {
    pub(crate) app_id: String,
    pub(crate) mch_id: String,
    pub(crate) service_host: String,
    pub(crate) notify_url: String,
    pub(crate) api_v3_key: String,
    pub(crate) merchant_serial: String,
    pub(crate) merchant_private_key: RsaPrivateKey,
    pub(crate) signing_key: Arc<SigningKey<Sha256>>,
    pub(crate) merchant_certificate: Certificate,
    pub(crate) platform_certs: CertStore,
    pub(crate) timeout: Duration,
    pub(crate) log_level: Level,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) codec: Arc<dyn JsonCodec>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn mch_id(&self) -> &str {
        &self.mch_id
    }

    pub fn service_host(&self) -> &str {
        &self.service_host
    }

    pub fn notify_url(&self) -> &str {
        &self.notify_url
    }

    pub fn merchant_serial(&self) -> &str {
        &self.merchant_serial
    }

    pub fn platform_certs(&self) -> &CertStore {
        &self.platform_certs
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }

    pub(crate) fn api_v3_key(&self) -> &str {
        &self.api_v3_key
    }

    pub(crate) fn signing_key(&self) -> &Arc<SigningKey<Sha256>> {
        &self.signing_key
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn codec(&self) -> &dyn JsonCodec {
        self.codec.as_ref()
    }

    fn validate(&self) -> Result<(), WxPayError> {
        fn required(name: &str, value: &str) -> Result<(), WxPayError> {
            if value.is_empty() {
                return Err(WxPayError::Config(format!("{name} is required")));
            }
            Ok(())
        }

        required("app_id", &self.app_id)?;
        required("mch_id", &self.mch_id)?;
        required("service_host", &self.service_host)?;
        required("notify_url", &self.notify_url)?;
        required("merchant_serial", &self.merchant_serial)?;

        // Empty is allowed until the first AEAD use; non-empty must be exact.
        if !self.api_v3_key.is_empty() && self.api_v3_key.len() != 32 {
            return Err(WxPayError::Config(format!(
                "api_v3_key must be 32 bytes, got {}",
                self.api_v3_key.len()
            )));
        }

        // The key must produce a signature before it is trusted with live
        // requests.
        let probe = sign_sha256_rsa(&self.signing_key, SIGN_PROBE);
        if probe.is_empty() {
            return Err(WxPayError::Config("merchant private key cannot sign".into()));
        }

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("service_host", &self.service_host)
            .field("notify_url", &self.notify_url)
            .field("api_v3_key", &"...")
            .field("merchant_serial", &self.merchant_serial)
            .field("merchant_private_key", &"...")
            .field("platform_certs", &self.platform_certs.len())
            .field("timeout", &self.timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    app_id: Option<String>,
    mch_id: Option<String>,
    service_host: Option<String>,
    notify_url: Option<String>,
    api_v3_key: Option<String>,
    merchant_serial: Option<String>,
    merchant_private_key_pem: Option<String>,
    merchant_certificate_pem: Option<String>,
    platform_certs: Vec<PlatformCert>,
    timeout: Option<Duration>,
    log_level: Option<Level>,
    transport: Option<Arc<dyn Transport>>,
    codec: Option<Arc<dyn JsonCodec>>,
}

impl ConfigBuilder {
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn mch_id(mut self, mch_id: impl Into<String>) -> Self {
        self.mch_id = Some(mch_id.into());
        self
    }

    pub fn service_host(mut self, service_host: impl Into<String>) -> Self {
        self.service_host = Some(service_host.into());
        self
    }

    pub fn notify_url(mut self, notify_url: impl Into<String>) -> Self {
        self.notify_url = Some(notify_url.into());
        self
    }

    pub fn api_v3_key(mut self, api_v3_key: impl Into<String>) -> Self {
        self.api_v3_key = Some(api_v3_key.into());
        self
    }

    pub fn merchant_serial(mut self, merchant_serial: impl Into<String>) -> Self {
        self.merchant_serial = Some(merchant_serial.into());
        self
    }

    pub fn merchant_private_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.merchant_private_key_pem = Some(pem.into());
        self
    }

    pub fn merchant_certificate_pem(mut self, pem: impl Into<String>) -> Self {
        self.merchant_certificate_pem = Some(pem.into());
        self
    }

    /// Seed the platform certificate store (e.g. from a cache). Usually left
    /// empty and populated by `get_certificates` or the refresher.
    pub fn platform_cert(mut self, cert: PlatformCert) -> Self {
        self.platform_certs.push(cert);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn log_level(mut self, log_level: Level) -> Self {
        self.log_level = Some(log_level);
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn codec(mut self, codec: impl JsonCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    pub fn build(self) -> Result<Config, WxPayError> {
        let app_id = self
            .app_id
            .ok_or_else(|| WxPayError::Config("app_id is required".into()))?;
        let mch_id = self
            .mch_id
            .ok_or_else(|| WxPayError::Config("mch_id is required".into()))?;
        let notify_url = self
            .notify_url
            .ok_or_else(|| WxPayError::Config("notify_url is required".into()))?;
        let merchant_serial = self
            .merchant_serial
            .ok_or_else(|| WxPayError::Config("merchant_serial is required".into()))?;
        let private_key_pem = self
            .merchant_private_key_pem
            .ok_or_else(|| WxPayError::Config("merchant_private_key_pem is required".into()))?;
        let certificate_pem = self
            .merchant_certificate_pem
            .ok_or_else(|| WxPayError::Config("merchant_certificate_pem is required".into()))?;

        let merchant_private_key = pem::parse_private_key(&private_key_pem)?;
        let signing_key = Arc::new(SigningKey::<Sha256>::new(merchant_private_key.clone()));
        let merchant_certificate = pem::parse_certificate(&certificate_pem)?;

        let config = Config {
            app_id,
            mch_id,
            service_host: self
                .service_host
                .unwrap_or_else(|| DEFAULT_SERVICE_HOST.to_string()),
            notify_url,
            api_v3_key: self.api_v3_key.unwrap_or_default(),
            merchant_serial,
            merchant_private_key,
            signing_key,
            merchant_certificate,
            platform_certs: CertStore::from_certs(self.platform_certs),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            log_level: self.log_level.unwrap_or(Level::INFO),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::new())),
            codec: self.codec.unwrap_or_else(|| Arc::new(SerdeJsonCodec)),
        };

        config.validate()?;
        Ok(config)
    }
}

/// A partial configuration update. `None` fields keep their current value.
#[derive(Default)]
pub struct ConfigPatch {
    pub app_id: Option<String>,
    pub mch_id: Option<String>,
    pub service_host: Option<String>,
    pub notify_url: Option<String>,
    pub api_v3_key: Option<String>,
    pub merchant_serial: Option<String>,
    pub merchant_private_key_pem: Option<String>,
    pub merchant_certificate_pem: Option<String>,
    pub timeout: Option<Duration>,
    pub log_level: Option<Level>,
    pub transport: Option<Arc<dyn Transport>>,
    pub codec: Option<Arc<dyn JsonCodec>>,
}

/// Single source of truth for the active configuration.
///
/// Readers clone the current `Arc` (O(1), no allocation); writers are
/// serialized by the write lock and swap a fully-validated snapshot, so
/// in-flight readers see either the old or the new configuration, never a
/// mix.
pub struct ConfigStore {
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.current.read().unwrap())
    }

    /// Replace the whole configuration atomically.
    pub fn replace(&self, config: Config) {
        *self.current.write().unwrap() = Arc::new(config);
    }

    /// Merge a partial update into the current snapshot, revalidate, and
    /// swap. On failure the store is unchanged.
    pub fn update(&self, patch: ConfigPatch) -> Result<(), WxPayError> {
        let mut guard = self.current.write().unwrap();
        let mut candidate = (**guard).clone();

        if let Some(app_id) = patch.app_id {
            candidate.app_id = app_id;
        }
        if let Some(mch_id) = patch.mch_id {
            candidate.mch_id = mch_id;
        }
        if let Some(service_host) = patch.service_host {
            candidate.service_host = service_host;
        }
        if let Some(notify_url) = patch.notify_url {
            candidate.notify_url = notify_url;
        }
        if let Some(api_v3_key) = patch.api_v3_key {
            candidate.api_v3_key = api_v3_key;
        }
        if let Some(merchant_serial) = patch.merchant_serial {
            candidate.merchant_serial = merchant_serial;
        }
        if let Some(pem_str) = patch.merchant_private_key_pem {
            candidate.merchant_private_key = pem::parse_private_key(&pem_str)?;
            candidate.signing_key = Arc::new(SigningKey::<Sha256>::new(
                candidate.merchant_private_key.clone(),
            ));
        }
        if let Some(pem_str) = patch.merchant_certificate_pem {
            candidate.merchant_certificate = pem::parse_certificate(&pem_str)?;
        }
        if let Some(timeout) = patch.timeout {
            candidate.timeout = timeout;
        }
        if let Some(log_level) = patch.log_level {
            candidate.log_level = log_level;
        }
        if let Some(transport) = patch.transport {
            candidate.transport = transport;
        }
        if let Some(codec) = patch.codec {
            candidate.codec = codec;
        }

        candidate.validate()?;
        *guard = Arc::new(candidate);
        Ok(())
    }

    /// Swap in a new platform certificate set. Replaces the entire set:
    /// afterwards a serial resolves iff it is in `certs`.
    pub fn update_certificates(&self, certs: Vec<PlatformCert>) {
        let mut guard = self.current.write().unwrap();
        let mut candidate = (**guard).clone();
        candidate.platform_certs = CertStore::from_certs(certs);
        *guard = Arc::new(candidate);
    }
}
