use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{current_timestamp, Method, Prefill, WxPayClient};
use crate::crypto::sign::{generate_nonce, sign_sha256_rsa};
use crate::error::WxPayError;
use crate::model::prepay::*;

impl WxPayClient {
    /// Native prepay (scannable QR).
    ///
    /// POST /v3/pay/transactions/native
    pub async fn create_native(
        &self,
        req: &NativePrepayRequest,
    ) -> Result<NativePrepayResponse, WxPayError> {
        self.create_transaction("/v3/pay/transactions/native", req)
            .await
    }

    /// JSAPI prepay (mini-program / official account).
    ///
    /// POST /v3/pay/transactions/jsapi
    pub async fn create_jsapi(
        &self,
        req: &JsapiPrepayRequest,
    ) -> Result<JsapiPrepayResponse, WxPayError> {
        self.create_transaction("/v3/pay/transactions/jsapi", req)
            .await
    }

    /// H5 prepay (mobile web).
    ///
    /// POST /v3/pay/transactions/h5
    pub async fn create_h5(&self, req: &H5PrepayRequest) -> Result<H5PrepayResponse, WxPayError> {
        self.create_transaction("/v3/pay/transactions/h5", req).await
    }

    /// Build the mini-program payment invocation form from a prepay_id.
    ///
    /// The string-to-sign is `"{appId}\n{timeStamp}\n{nonceStr}\n{package}\n"`;
    /// the result is handed to the frontend as-is.
    pub fn miniapp_pay_form(&self, prepay_id: &str) -> MiniappPayForm {
        let config = self.config();
        let time_stamp = current_timestamp().to_string();
        let nonce_str = generate_nonce();
        let package = format!("prepay_id={prepay_id}");

        let sign_msg = format!("{}\n{}\n{}\n{}\n", config.app_id(), time_stamp, nonce_str, package);
        let pay_sign = sign_sha256_rsa(config.signing_key(), &sign_msg);

        MiniappPayForm {
            app_id: config.app_id().to_string(),
            time_stamp,
            nonce_str,
            package,
            sign_type: "RSA".to_string(),
            pay_sign,
        }
    }

    async fn create_transaction<Req, Resp>(&self, path: &str, req: &Req) -> Result<Resp, WxPayError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let config = self.config();
        let body = serde_json::to_value(req)?;
        let value = self
            .core()
            .execute(
                &config,
                Method::Post,
                path,
                &[],
                Some(body),
                Prefill::TRANSACTION,
                true,
            )
            .await?;
        serde_json::from_value(value).map_err(WxPayError::Decode)
    }
}
