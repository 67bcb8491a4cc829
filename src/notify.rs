//! Webhook notification handling.
//!
//! The merchant's own HTTPS server receives the callback and passes the raw
//! headers and body here. Verification and decryption are synchronous and
//! operate on a single configuration snapshot.

use serde_json::Value;

use crate::client::{current_timestamp, header_value, verify_response, WxPayClient};
use crate::crypto::decrypt::open_resource;
use crate::error::WxPayError;
use crate::model::common::EncryptedResource;
use crate::model::notify::{NotifyEnvelope, NotifyEvent};

/// Notifications older or newer than this are rejected as replays.
const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

const ENCRYPTED_RESOURCE_TYPE: &str = "encrypt-resource";

impl WxPayClient {
    /// Open an AEAD-sealed resource with the configured `api_v3_key`.
    pub fn decrypt_resource(&self, resource: &EncryptedResource) -> Result<String, WxPayError> {
        let config = self.config();
        open_resource(config.api_v3_key(), resource)
    }

    /// Verify and open a notification.
    ///
    /// Checks timestamp freshness, verifies the signature against the
    /// platform certificate set, decodes the envelope, and for
    /// `encrypt-resource` payloads replaces `resource` with the decrypted
    /// JSON object.
    pub fn handle_notification(
        &self,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<NotifyEvent, WxPayError> {
        let config = self.config();

        let timestamp = header_value(headers, "wechatpay-timestamp")
            .ok_or_else(|| WxPayError::Notify("missing Wechatpay-Timestamp header".into()))?;
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| WxPayError::Notify(format!("invalid timestamp: {timestamp}")))?;
        let skew = (current_timestamp() - ts).abs();
        if skew > MAX_TIMESTAMP_SKEW_SECS {
            return Err(WxPayError::Notify(format!(
                "notification timestamp outside the accepted window: skew={skew}s"
            )));
        }

        if !verify_response(&config, headers, body.as_bytes()) {
            return Err(WxPayError::Verify(
                "notification signature verification failed".into(),
            ));
        }

        let envelope: NotifyEnvelope =
            serde_json::from_value(config.codec().decode(body.as_bytes())?)?;
        let NotifyEnvelope {
            id,
            create_time,
            event_type,
            resource_type,
            summary,
            resource,
        } = envelope;

        let resource: Value = if resource_type == ENCRYPTED_RESOURCE_TYPE {
            let sealed: EncryptedResource = serde_json::from_value(resource)?;
            let plaintext = open_resource(config.api_v3_key(), &sealed)?;
            config.codec().decode(plaintext.as_bytes())?
        } else {
            resource
        };

        Ok(NotifyEvent {
            id,
            create_time,
            event_type,
            resource_type,
            summary,
            resource,
        })
    }

    /// Handle a refund result notification. Refunds use the shared envelope
    /// format; decode the typed payload with
    /// [`NotifyEvent::decode_resource::<RefundNotify>`](crate::model::notify::RefundNotify).
    pub fn handle_refund_notification(
        &self,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<NotifyEvent, WxPayError> {
        self.handle_notification(headers, body)
    }
}
