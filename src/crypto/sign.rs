use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
    Engine,
};
use rand::Rng;
use rsa::{
    pkcs1v15::SigningKey,
    sha2::Sha256,
    signature::{RandomizedSigner, SignatureEncoding},
};

/// Build the signing message per the APIv3 request signature scheme.
///
/// Format: `"{method}\n{url}\n{timestamp}\n{nonce}\n{body}\n"`
///
/// - `method`: upper-case HTTP method token, e.g. "GET", "POST"
/// - `url`: absolute path with query string, e.g. "/v3/pay/transactions/jsapi"
/// - `timestamp`: Unix timestamp in seconds
/// - `nonce`: random string
/// - `body`: request body (empty string for GET)
pub fn build_sign_message(
    method: &str,
    url: &str,
    timestamp: i64,
    nonce: &str,
    body: &str,
) -> String {
    format!("{method}\n{url}\n{timestamp}\n{nonce}\n{body}\n")
}

/// Sign the message using SHA256withRSA (PKCS#1 v1.5) and return the
/// base64-encoded signature. Deterministic for a fixed key and message.
pub fn sign_sha256_rsa(signing_key: &SigningKey<Sha256>, message: &str) -> String {
    let mut rng = rand::thread_rng();
    let signature = signing_key.sign_with_rng(&mut rng, message.as_bytes());
    BASE64.encode(signature.to_bytes())
}

/// Build the complete Authorization header value.
///
/// Format: `WECHATPAY2-SHA256-RSA2048 mchid="...",nonce_str="...",timestamp="...",serial_no="...",signature="..."`
/// The field order is part of the contract.
pub fn build_authorization_header(
    mch_id: &str,
    serial_no: &str,
    timestamp: i64,
    nonce: &str,
    signature: &str,
) -> String {
    format!(
        r#"WECHATPAY2-SHA256-RSA2048 mchid="{mch_id}",nonce_str="{nonce}",timestamp="{timestamp}",serial_no="{serial_no}",signature="{signature}""#
    )
}

/// Generate a request nonce: 12 random bytes, URL-safe base64, truncated to
/// the first 12 characters.
pub fn generate_nonce() -> String {
    let mut raw = [0u8; 12];
    rand::thread_rng().fill(&mut raw[..]);
    let mut nonce = URL_SAFE_NO_PAD.encode(raw);
    nonce.truncate(12);
    nonce
}
