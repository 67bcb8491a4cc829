use aes_gcm::{
    aead::{Aead, Payload},
    Aes256Gcm, KeyInit, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::WxPayError;
use crate::model::common::EncryptedResource;

pub const AEAD_ALGORITHM: &str = "AEAD_AES_256_GCM";

/// Decrypt an APIv3 ciphertext using AES-256-GCM.
///
/// - `api_v3_key`: 32-byte UTF-8 string used directly as the AES key
/// - `nonce`: from `resource.nonce` (12 bytes)
/// - `associated_data`: from `resource.associated_data`
/// - `ciphertext_base64`: base64 of ciphertext||tag, tag length 16
///
/// Returns the plaintext as a UTF-8 string (all APIv3 plaintexts are JSON or
/// PEM text). A key of the wrong length is a configuration error, not a
/// decryption failure.
pub fn decrypt_aes_256_gcm(
    api_v3_key: &str,
    nonce: &str,
    associated_data: &str,
    ciphertext_base64: &str,
) -> Result<String, WxPayError> {
    let key_bytes = api_v3_key.as_bytes();
    if key_bytes.len() != 32 {
        return Err(WxPayError::Config(format!(
            "api_v3_key must be 32 bytes, got {}",
            key_bytes.len()
        )));
    }

    let nonce_bytes = nonce.as_bytes();
    if nonce_bytes.len() != 12 {
        return Err(WxPayError::Decrypt(format!(
            "nonce must be 12 bytes, got {}",
            nonce_bytes.len()
        )));
    }

    let ciphertext = BASE64
        .decode(ciphertext_base64)
        .map_err(|e| WxPayError::Decrypt(format!("base64 decode: {e}")))?;

    let cipher = Aes256Gcm::new_from_slice(key_bytes)
        .map_err(|e| WxPayError::Decrypt(format!("create cipher: {e}")))?;

    let gcm_nonce = Nonce::from_slice(nonce_bytes);
    let payload = Payload {
        msg: &ciphertext,
        aad: associated_data.as_bytes(),
    };

    let plaintext = cipher
        .decrypt(gcm_nonce, payload)
        .map_err(|_| WxPayError::Decrypt("AEAD authentication failed".into()))?;

    String::from_utf8(plaintext).map_err(|e| WxPayError::Decrypt(format!("utf8 decode: {e}")))
}

/// Open an [`EncryptedResource`] (certificate payloads and notification
/// resources share the layout). Rejects any algorithm other than
/// `AEAD_AES_256_GCM` before touching the ciphertext.
pub fn open_resource(api_v3_key: &str, resource: &EncryptedResource) -> Result<String, WxPayError> {
    if resource.algorithm != AEAD_ALGORITHM {
        return Err(WxPayError::Decrypt(format!(
            "unsupported algorithm: {}",
            resource.algorithm
        )));
    }
    decrypt_aes_256_gcm(
        api_v3_key,
        &resource.nonce,
        &resource.associated_data,
        &resource.ciphertext,
    )
}
