use serde::Deserialize;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum WxPayError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("signature verification failed: {0}")]
    Verify(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// Non-2xx HTTP status. The raw body is preserved so callers can inspect
    /// WeChat's error codes (`SYSTEMERROR`, `NOTENOUGH`, ...) themselves.
    #[error("WeChat Pay returned HTTP {status}: {body}")]
    BadResponse { status: u16, body: String },

    #[error("transport failed: {0}")]
    Transport(TransportError),

    #[error("JSON encode/decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request canceled")]
    Canceled,

    #[error("certificate error: {0}")]
    Cert(String),

    #[error("notification error: {0}")]
    Notify(String),
}

impl From<TransportError> for WxPayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Canceled => WxPayError::Canceled,
            other => WxPayError::Transport(other),
        }
    }
}

impl WxPayError {
    /// Best-effort parse of a `BadResponse` body into WeChat's structured
    /// error record. Returns `None` for other variants or unparseable bodies.
    pub fn api_detail(&self) -> Option<ApiErrorBody> {
        match self {
            WxPayError::BadResponse { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

/// WeChat's standard error body: `{"code": "...", "message": "...", ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}
