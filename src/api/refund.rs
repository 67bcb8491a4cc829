use crate::client::{encode_path_segment, Method, Prefill, WxPayClient};
use crate::error::WxPayError;
use crate::model::refund::{RefundRequest, RefundResponse};

impl WxPayClient {
    /// Create a refund.
    ///
    /// POST /v3/refund/domestic/refunds
    pub async fn create_refund(&self, req: &RefundRequest) -> Result<RefundResponse, WxPayError> {
        let config = self.config();
        let body = serde_json::to_value(req)?;
        let value = self
            .core()
            .execute(
                &config,
                Method::Post,
                "/v3/refund/domestic/refunds",
                &[],
                Some(body),
                Prefill::REFUND,
                true,
            )
            .await?;
        serde_json::from_value(value).map_err(WxPayError::Decode)
    }

    /// Query a refund by out_refund_no.
    ///
    /// GET /v3/refund/domestic/refunds/{out_refund_no}
    pub async fn query_refund(&self, out_refund_no: &str) -> Result<RefundResponse, WxPayError> {
        let config = self.config();
        let path = format!(
            "/v3/refund/domestic/refunds/{}",
            encode_path_segment(out_refund_no)
        );
        let value = self
            .core()
            .execute(&config, Method::Get, &path, &[], None, Prefill::NONE, true)
            .await?;
        serde_json::from_value(value).map_err(WxPayError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::refund::RefundAmount;
    use crate::testutil::{self, MockTransport};
    use serde_json::{json, Value};

    fn refund_response_body() -> String {
        json!({
            "refund_id": "50000001",
            "out_refund_no": "REFUND_1",
            "transaction_id": "4200001",
            "out_trade_no": "ORDER_1",
            "channel": "ORIGINAL",
            "user_received_account": "支付用户零钱",
            "success_time": null,
            "create_time": "2024-03-01T10:00:00+08:00",
            "status": "PROCESSING",
            "amount": {
                "total": 100,
                "refund": 100,
                "payer_total": 100,
                "payer_refund": 100,
                "settlement_refund": 100,
                "settlement_total": 100,
                "discount_refund": 0,
                "currency": "CNY"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_create_refund_prefills_notify_url_only() {
        let transport =
            MockTransport::new(vec![testutil::signed_response(200, &refund_response_body())]);
        let client = WxPayClient::new(testutil::test_config_with_certs(transport.clone()));

        let request = RefundRequest {
            transaction_id: None,
            out_trade_no: Some("ORDER_1".to_string()),
            out_refund_no: "REFUND_1".to_string(),
            reason: None,
            notify_url: None,
            amount: RefundAmount {
                refund: 100,
                total: 100,
                currency: "CNY".to_string(),
                from: None,
            },
            funds_account: None,
            goods_detail: None,
        };
        let response = client.create_refund(&request).await.unwrap();
        assert_eq!(response.status, "PROCESSING");
        assert_eq!(response.amount.refund, 100);

        let requests = transport.requests();
        assert!(requests[0].url.ends_with("/v3/refund/domestic/refunds"));
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["notify_url"], "https://merchant.example.com/notify");
        // Refund bodies carry no appid/mchid; the pipeline must not add them.
        assert!(body.get("appid").is_none());
        assert!(body.get("mchid").is_none());
    }

    #[tokio::test]
    async fn test_query_refund_path() {
        let transport =
            MockTransport::new(vec![testutil::signed_response(200, &refund_response_body())]);
        let client = WxPayClient::new(testutil::test_config_with_certs(transport.clone()));

        let response = client.query_refund("REFUND_1").await.unwrap();
        assert_eq!(response.out_refund_no, "REFUND_1");

        let requests = transport.requests();
        assert_eq!(requests[0].method, "GET");
        assert!(requests[0]
            .url
            .ends_with("/v3/refund/domestic/refunds/REFUND%5F1"));
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_create_refund_bad_response() {
        let transport = MockTransport::new(vec![testutil::plain_response(
            403,
            r#"{"code":"NOTENOUGH","message":"insufficient balance"}"#,
        )]);
        let client = WxPayClient::new(testutil::test_config_with_certs(transport));

        let request = RefundRequest {
            transaction_id: None,
            out_trade_no: Some("ORDER_1".to_string()),
            out_refund_no: "REFUND_1".to_string(),
            reason: None,
            notify_url: None,
            amount: RefundAmount {
                refund: 100,
                total: 100,
                currency: "CNY".to_string(),
                from: None,
            },
            funds_account: None,
            goods_detail: None,
        };
        let err = client.create_refund(&request).await.unwrap_err();
        assert_eq!(err.api_detail().unwrap().code, "NOTENOUGH");
    }
}
