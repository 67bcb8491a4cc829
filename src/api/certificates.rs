use crate::client::WxPayClient;
use crate::error::WxPayError;
use crate::model::cert::CertificateEntry;

impl WxPayClient {
    /// Download the platform certificate list.
    ///
    /// GET /v3/certificates
    ///
    /// Each entry's AEAD payload is decrypted into its `certificate` field.
    /// Pass `verify = false` only for the bootstrap call while the
    /// certificate store is still empty: the response signature cannot be
    /// checked yet, but the list is decrypted and returned all the same.
    pub async fn get_certificates(
        &self,
        verify: bool,
    ) -> Result<Vec<CertificateEntry>, WxPayError> {
        let config = self.config();
        self.core().get_certificates(&config, verify).await
    }

    /// Fetch the certificate list and atomically replace the store contents.
    ///
    /// Verification is enabled unless the store is empty (first run). At most
    /// one refresh runs at a time, shared with the background refresher.
    /// Returns the number of certificates installed.
    pub async fn refresh_certificates(&self) -> Result<usize, WxPayError> {
        self.core().refresh_certificates().await
    }
}
