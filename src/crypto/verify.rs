use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::{pkcs1v15::VerifyingKey, sha2::Sha256, signature::Verifier};

/// Build the verification message for platform-signed responses and
/// notifications.
///
/// Format: `"{timestamp}\n{nonce}\n{body}\n"`. Unlike request signing, the
/// method and URL are not part of the message; the asymmetry is part of the
/// protocol.
pub fn build_verify_message(timestamp: &str, nonce: &str, body: &str) -> String {
    format!("{timestamp}\n{nonce}\n{body}\n")
}

/// Verify a platform signature.
///
/// - `verifying_key`: RSA verifying key from the platform certificate
/// - `timestamp`: from the `Wechatpay-Timestamp` header
/// - `nonce`: from the `Wechatpay-Nonce` header
/// - `body`: raw response/notification body
/// - `signature_base64`: from the `Wechatpay-Signature` header
///
/// Returns `false` on any mismatch, including undecodable signature bytes.
/// Never errors.
pub fn verify_signature(
    verifying_key: &VerifyingKey<Sha256>,
    timestamp: &str,
    nonce: &str,
    body: &str,
    signature_base64: &str,
) -> bool {
    let message = build_verify_message(timestamp, nonce, body);

    let sig_bytes = match BASE64.decode(signature_base64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = match rsa::pkcs1v15::Signature::try_from(sig_bytes.as_slice()) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    verifying_key.verify(message.as_bytes(), &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sign::sign_sha256_rsa;
    use rsa::pkcs1v15::SigningKey;
    use rsa::{RsaPrivateKey, RsaPublicKey};

    fn keypair() -> (SigningKey<Sha256>, VerifyingKey<Sha256>) {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        (
            SigningKey::<Sha256>::new(private_key),
            VerifyingKey::<Sha256>::new(public_key),
        )
    }

    #[test]
    fn test_verify_roundtrip() {
        let (signing_key, verifying_key) = keypair();

        let timestamp = "1554208460";
        let nonce = "test_nonce_str";
        let body = r#"{"code":"SUCCESS"}"#;

        let message = build_verify_message(timestamp, nonce, body);
        let sig = sign_sha256_rsa(&signing_key, &message);

        assert!(verify_signature(&verifying_key, timestamp, nonce, body, &sig));
    }

    #[test]
    fn test_verify_tampered_body() {
        let (signing_key, verifying_key) = keypair();

        let timestamp = "1554208460";
        let nonce = "test_nonce_str";
        let body = r#"{"code":"SUCCESS"}"#;

        let message = build_verify_message(timestamp, nonce, body);
        let sig = sign_sha256_rsa(&signing_key, &message);

        let tampered = r#"{"code":"FAIL"}"#;
        assert!(!verify_signature(
            &verifying_key,
            timestamp,
            nonce,
            tampered,
            &sig
        ));
    }

    #[test]
    fn test_verify_tampered_timestamp() {
        let (signing_key, verifying_key) = keypair();

        let nonce = "nonce";
        let body = r#"{"code":"SUCCESS"}"#;
        let message = build_verify_message("1554208460", nonce, body);
        let sig = sign_sha256_rsa(&signing_key, &message);

        assert!(!verify_signature(
            &verifying_key,
            "9999999999",
            nonce,
            body,
            &sig
        ));
    }

    #[test]
    fn test_verify_tampered_nonce() {
        let (signing_key, verifying_key) = keypair();

        let body = "{}";
        let message = build_verify_message("1554208460", "nonce", body);
        let sig = sign_sha256_rsa(&signing_key, &message);

        assert!(!verify_signature(
            &verifying_key,
            "1554208460",
            "other",
            body,
            &sig
        ));
    }

    #[test]
    fn test_verify_wrong_key() {
        let (signing_key_a, _) = keypair();
        let (_, verifying_key_b) = keypair();

        let timestamp = "1554208460";
        let nonce = "nonce";
        let body = "body";

        let message = build_verify_message(timestamp, nonce, body);
        let sig = sign_sha256_rsa(&signing_key_a, &message);

        assert!(!verify_signature(
            &verifying_key_b,
            timestamp,
            nonce,
            body,
            &sig
        ));
    }

    #[test]
    fn test_verify_invalid_base64_is_false() {
        let (_, verifying_key) = keypair();
        assert!(!verify_signature(
            &verifying_key,
            "123",
            "nonce",
            "body",
            "not-valid!!!"
        ));
    }

    #[test]
    fn test_verify_garbage_signature_bytes_is_false() {
        let (_, verifying_key) = keypair();
        // Valid base64, wrong length for an RSA-2048 signature.
        let sig = BASE64.encode(b"short");
        assert!(!verify_signature(&verifying_key, "123", "nonce", "body", &sig));
    }

    #[test]
    fn test_build_verify_message_format() {
        let msg = build_verify_message("1554208460", "nonce123", r#"{"code":"OK"}"#);
        assert_eq!(msg, "1554208460\nnonce123\n{\"code\":\"OK\"}\n");
    }

    #[test]
    fn test_build_verify_message_empty_body() {
        let msg = build_verify_message("123", "nonce", "");
        assert_eq!(msg, "123\nnonce\n\n");
    }
}
