//! Pluggable JSON codec.

use serde_json::Value;

use crate::error::WxPayError;

/// Encode/decode between JSON values and wire bytes. The pipeline maps typed
/// records to and from `Value` itself; only the byte conversion is pluggable.
pub trait JsonCodec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, WxPayError>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, WxPayError>;
}

/// Default codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, WxPayError> {
        serde_json::to_vec(value).map_err(WxPayError::Decode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, WxPayError> {
        serde_json::from_slice(bytes).map_err(WxPayError::Decode)
    }
}
