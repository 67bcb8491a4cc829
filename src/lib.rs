//! WeChat Pay APIv3 client.
//!
//! Signed merchant requests (RSA-SHA256 over the APIv3 canonical string),
//! verification of platform-signed responses and webhooks against a rotating
//! certificate set, AES-256-GCM decryption of confidential resources, and a
//! hot-updatable configuration store with a background certificate refresher.
//!
//! The HTTPS transport and the JSON codec are pluggable capabilities; the
//! default implementations back onto `reqwest` and `serde_json`.

pub mod api;
pub mod cert;
pub mod client;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod model;
pub mod notify;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use cert::refresher::RefresherState;
pub use client::WxPayClient;
pub use codec::{JsonCodec, SerdeJsonCodec};
pub use config::{Config, ConfigBuilder, ConfigPatch, ConfigStore};
pub use error::WxPayError;
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
