use serde::Deserialize;
use serde_json::Value;

use super::common::Payer;
use super::order::OrderAmount;
use crate::error::WxPayError;

/// Raw notification envelope as posted by WeChat Pay. `resource` is left as
/// an opaque value until the resource type is known.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyEnvelope {
    pub id: String,
    pub create_time: String,
    pub event_type: String,
    pub resource_type: String,
    pub summary: String,
    pub resource: Value,
}

/// A verified notification with its resource opened: for
/// `resource_type == "encrypt-resource"` the `resource` holds the decrypted
/// JSON object, otherwise it is the envelope's resource as delivered.
#[derive(Debug, Clone)]
pub struct NotifyEvent {
    pub id: String,
    pub create_time: String,
    pub event_type: String,
    pub resource_type: String,
    pub summary: String,
    pub resource: Value,
}

impl NotifyEvent {
    /// Decode the opened resource into a typed record such as
    /// [`RefundNotify`] or [`TransactionNotify`].
    pub fn decode_resource<T: serde::de::DeserializeOwned>(&self) -> Result<T, WxPayError> {
        serde_json::from_value(self.resource.clone()).map_err(WxPayError::Decode)
    }
}

/// Decrypted payment-result notification payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionNotify {
    pub appid: String,
    pub mchid: String,
    pub out_trade_no: String,
    pub transaction_id: String,
    pub trade_type: String,
    pub trade_state: String,
    pub trade_state_desc: String,
    pub bank_type: String,
    pub success_time: String,
    pub payer: Payer,
    pub amount: OrderAmount,
    #[serde(default)]
    pub attach: Option<String>,
}

/// Decrypted refund-result notification payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundNotify {
    pub mchid: String,
    pub out_trade_no: String,
    pub transaction_id: String,
    pub out_refund_no: String,
    pub refund_id: String,
    pub refund_status: String,
    #[serde(default)]
    pub success_time: Option<String>,
    pub user_received_account: String,
    pub amount: RefundNotifyAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundNotifyAmount {
    pub total: i64,
    pub refund: i64,
    pub payer_total: i64,
    pub payer_refund: i64,
}
