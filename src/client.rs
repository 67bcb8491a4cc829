use std::sync::{Arc, OnceLock};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use tracing::{debug, Level};

use crate::cert::refresher::{CertRefresher, RefresherState, DEFAULT_REFRESH_INTERVAL};
use crate::cert::store::PlatformCert;
use crate::config::{Config, ConfigStore};
use crate::crypto::decrypt::open_resource;
use crate::crypto::sign::{
    build_authorization_header, build_sign_message, generate_nonce, sign_sha256_rsa,
};
use crate::crypto::verify::verify_signature;
use crate::error::WxPayError;
use crate::model::cert::{CertificateEntry, CertificatesResponse};
use crate::transport::TransportRequest;

pub(crate) const USER_AGENT: &str = concat!("wxpay-apiv3-rust/", env!("CARGO_PKG_VERSION"));
const CERTIFICATES_PATH: &str = "/v3/certificates";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

impl Method {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Which snapshot fields the pipeline inserts into a POST body when absent.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Prefill {
    pub appid: bool,
    pub mchid: bool,
    pub notify_url: bool,
}

impl Prefill {
    pub(crate) const NONE: Prefill = Prefill {
        appid: false,
        mchid: false,
        notify_url: false,
    };
    /// The three create-transaction endpoints.
    pub(crate) const TRANSACTION: Prefill = Prefill {
        appid: true,
        mchid: true,
        notify_url: true,
    };
    /// Create-refund carries its own merchant identity; only the callback
    /// URL is filled.
    pub(crate) const REFUND: Prefill = Prefill {
        appid: false,
        mchid: false,
        notify_url: true,
    };
}

/// WeChat Pay APIv3 client.
///
/// Holds the configuration store and the certificate refresher; all endpoint
/// operations live in `api/` as thin adapters over the request pipeline.
/// Clients are self-contained values; multiple clients with different
/// configurations can coexist.
pub struct WxPayClient {
    core: Arc<ClientCore>,
    refresher: OnceLock<CertRefresher>,
}

pub(crate) struct ClientCore {
    pub(crate) store: ConfigStore,
    /// At most one certificate refresh in flight, across the background
    /// refresher and manual triggers.
    pub(crate) refresh_gate: tokio::sync::Mutex<()>,
}

impl WxPayClient {
    pub fn new(config: Config) -> Self {
        Self {
            core: Arc::new(ClientCore {
                store: ConfigStore::new(config),
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
            refresher: OnceLock::new(),
        }
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Arc<Config> {
        self.core.store.snapshot()
    }

    /// The configuration store, for hot updates.
    pub fn store(&self) -> &ConfigStore {
        &self.core.store
    }

    pub(crate) fn core(&self) -> &Arc<ClientCore> {
        &self.core
    }

    /// Verify a platform-signed message (response or webhook) against the
    /// current certificate set. Missing headers, an unknown serial, or an
    /// empty store all yield `false`.
    pub fn verify(&self, headers: &[(String, String)], body: &[u8]) -> bool {
        let config = self.core.store.snapshot();
        verify_response(&config, headers, body)
    }

    /// Start (or reschedule) the periodic certificate refresh. `None` uses
    /// the default one-day interval. Must be called within a tokio runtime.
    pub fn enable_auto_refresh(&self, interval: Option<Duration>) {
        let refresher = self
            .refresher
            .get_or_init(|| CertRefresher::spawn(Arc::clone(&self.core)));
        refresher.enable(interval.unwrap_or(DEFAULT_REFRESH_INTERVAL));
    }

    /// Cancel the periodic refresh. The background task stays parked until
    /// re-enabled or the client is dropped.
    pub fn disable_auto_refresh(&self) {
        if let Some(refresher) = self.refresher.get() {
            refresher.disable();
        }
    }

    pub fn refresher_state(&self) -> RefresherState {
        self.refresher
            .get()
            .map_or(RefresherState::Idle, CertRefresher::state)
    }
}

impl ClientCore {
    /// The request pipeline: encode and prefill the body, sign, exchange,
    /// check status, verify, decode.
    ///
    /// `config` is the single snapshot for the whole request; callers take it
    /// once at entry so the configuration cannot change mid-request.
    pub(crate) async fn execute(
        &self,
        config: &Config,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        prefill: Prefill,
        verify: bool,
    ) -> Result<Value, WxPayError> {
        // GET bodies are coerced to empty; they are never signed or sent.
        let body_str = match (method, body) {
            (Method::Post, Some(mut value)) => {
                apply_prefill(config, &mut value, prefill);
                let bytes = config.codec().encode(&value)?;
                String::from_utf8(bytes).map_err(|e| {
                    WxPayError::Config(format!("JSON codec produced non-UTF-8 output: {e}"))
                })?
            }
            _ => String::new(),
        };

        let canonical_url = build_canonical_url(path, query);
        let timestamp = current_timestamp();
        let nonce = generate_nonce();
        let sign_msg =
            build_sign_message(method.as_str(), &canonical_url, timestamp, &nonce, &body_str);

        // RSA-2048 signing costs 1-3ms; keep it off the async runtime.
        let signing_key = Arc::clone(config.signing_key());
        let signature =
            tokio::task::spawn_blocking(move || sign_sha256_rsa(&signing_key, &sign_msg))
                .await
                .map_err(|e| WxPayError::Config(format!("signing task join: {e}")))?;
        let authorization = build_authorization_header(
            config.mch_id(),
            config.merchant_serial(),
            timestamp,
            &nonce,
            &signature,
        );

        if config.log_level() >= Level::DEBUG {
            debug!(method = method.as_str(), url = %canonical_url, "sending signed request");
        }

        let request = TransportRequest {
            method: method.as_str().to_string(),
            url: format!("https://{}{}", config.service_host(), canonical_url),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), authorization),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
            ],
            body: body_str.into_bytes(),
            timeout: config.timeout(),
        };

        let response = config.transport().exchange(request).await?;

        if !(200..300).contains(&response.status) {
            return Err(WxPayError::BadResponse {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        if verify && !verify_response(config, &response.headers, &response.body) {
            return Err(WxPayError::Verify(
                "response signature verification failed".into(),
            ));
        }

        if response.body.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        config.codec().decode(&response.body)
    }

    /// Fetch `/v3/certificates` and decrypt each entry's payload into its
    /// `certificate` field. With `verify = false` (bootstrap, empty store)
    /// only the Verifier call is skipped; decryption still authenticates the
    /// payload against `api_v3_key`.
    pub(crate) async fn get_certificates(
        &self,
        config: &Config,
        verify: bool,
    ) -> Result<Vec<CertificateEntry>, WxPayError> {
        let value = self
            .execute(
                config,
                Method::Get,
                CERTIFICATES_PATH,
                &[],
                None,
                Prefill::NONE,
                verify,
            )
            .await?;
        let response: CertificatesResponse = serde_json::from_value(value)?;

        let mut entries = response.data;
        for entry in &mut entries {
            let pem = open_resource(config.api_v3_key(), &entry.encrypt_certificate)?;
            entry.certificate = Some(pem);
        }
        Ok(entries)
    }

    /// Fetch, decrypt, and atomically swap in the full certificate set.
    /// Verification is skipped only while the store is still empty.
    pub(crate) async fn refresh_certificates(&self) -> Result<usize, WxPayError> {
        let _gate = self.refresh_gate.lock().await;

        let config = self.store.snapshot();
        let verify = !config.platform_certs().is_empty();
        let entries = self.get_certificates(&config, verify).await?;

        let mut certs = Vec::with_capacity(entries.len());
        for entry in &entries {
            let pem = entry.certificate.as_deref().ok_or_else(|| {
                WxPayError::Cert("certificate payload missing after decryption".into())
            })?;
            certs.push(PlatformCert::from_pem(
                &entry.serial_no,
                &entry.effective_time,
                &entry.expire_time,
                pem,
            )?);
        }

        let count = certs.len();
        self.store.update_certificates(certs);
        Ok(count)
    }
}

/// Verify the four `Wechatpay-*` headers against the snapshot's certificate
/// store. Pure and lock-free; the store is part of the snapshot.
pub(crate) fn verify_response(config: &Config, headers: &[(String, String)], body: &[u8]) -> bool {
    let (Some(serial), Some(timestamp), Some(nonce), Some(signature)) = (
        header_value(headers, "wechatpay-serial"),
        header_value(headers, "wechatpay-timestamp"),
        header_value(headers, "wechatpay-nonce"),
        header_value(headers, "wechatpay-signature"),
    ) else {
        return false;
    };

    let Some(cert) = config.platform_certs().get(serial) else {
        return false;
    };
    let Ok(body_str) = std::str::from_utf8(body) else {
        return false;
    };

    verify_signature(&cert.verifying_key, timestamp, nonce, body_str, signature)
}

/// Case-insensitive header lookup.
pub(crate) fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Percent-encode a path segment or query component.
pub(crate) fn encode_path_segment(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

/// `path` alone, or `path?k1=v1&k2=v2` in the caller's pair order. The same
/// string is signed and sent.
pub(crate) fn build_canonical_url(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let joined = query
        .iter()
        .map(|(name, value)| format!("{}={}", encode_path_segment(name), encode_path_segment(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{joined}")
}

pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before UNIX epoch")
        .as_secs() as i64
}

fn apply_prefill(config: &Config, body: &mut Value, prefill: Prefill) {
    let Some(object) = body.as_object_mut() else {
        return;
    };
    if prefill.appid && !object.contains_key("appid") {
        object.insert("appid".into(), Value::String(config.app_id().to_string()));
    }
    if prefill.mchid && !object.contains_key("mchid") {
        object.insert("mchid".into(), Value::String(config.mch_id().to_string()));
    }
    if prefill.notify_url && !object.contains_key("notify_url") {
        object.insert(
            "notify_url".into(),
            Value::String(config.notify_url().to_string()),
        );
    }
}
