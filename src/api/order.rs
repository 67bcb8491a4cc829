use serde_json::json;

use crate::client::{encode_path_segment, Method, Prefill, WxPayClient};
use crate::error::WxPayError;
use crate::model::order::OrderQueryResponse;

impl WxPayClient {
    /// Query an order by merchant out_trade_no.
    ///
    /// GET /v3/pay/transactions/out-trade-no/{out_trade_no}?mchid={mchid}
    pub async fn query_order_by_out_trade_no(
        &self,
        out_trade_no: &str,
    ) -> Result<OrderQueryResponse, WxPayError> {
        let config = self.config();
        let path = format!(
            "/v3/pay/transactions/out-trade-no/{}",
            encode_path_segment(out_trade_no)
        );
        let value = self
            .core()
            .execute(
                &config,
                Method::Get,
                &path,
                &[("mchid", config.mch_id())],
                None,
                Prefill::NONE,
                true,
            )
            .await?;
        serde_json::from_value(value).map_err(WxPayError::Decode)
    }

    /// Query an order by WeChat transaction_id.
    ///
    /// GET /v3/pay/transactions/id/{transaction_id}?mchid={mchid}
    pub async fn query_order_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<OrderQueryResponse, WxPayError> {
        let config = self.config();
        let path = format!(
            "/v3/pay/transactions/id/{}",
            encode_path_segment(transaction_id)
        );
        let value = self
            .core()
            .execute(
                &config,
                Method::Get,
                &path,
                &[("mchid", config.mch_id())],
                None,
                Prefill::NONE,
                true,
            )
            .await?;
        serde_json::from_value(value).map_err(WxPayError::Decode)
    }

    /// Close an unpaid order. Any verifying 2xx (typically 204, no body) is
    /// success.
    ///
    /// POST /v3/pay/transactions/out-trade-no/{out_trade_no}/close
    pub async fn close_order(&self, out_trade_no: &str) -> Result<(), WxPayError> {
        let config = self.config();
        let path = format!(
            "/v3/pay/transactions/out-trade-no/{}/close",
            encode_path_segment(out_trade_no)
        );
        let body = json!({ "mchid": config.mch_id() });
        self.core()
            .execute(&config, Method::Post, &path, &[], Some(body), Prefill::NONE, true)
            .await?;
        Ok(())
    }
}
