//! Payment provider backends
//!
//! The entitlement service is an opaque remote capability: it can
//! report the current user and open its own checkout page. Which
//! backend is wired in (real, stub, or nothing) is decided once at
//! construction time by [`crate::license::PaymentBackend`].

use async_trait::async_trait;
use page_media_core::EntitlementError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Tab/page-opening capability of the hosting environment
#[async_trait]
pub trait PageOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), EntitlementError>;
}

/// Remote entitlement/payment capability
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch the remote user record; `paid` on it drives gating
    async fn fetch_user(&self) -> Result<Value, EntitlementError>;

    /// Open the vendor checkout page in a new tab
    async fn open_payment_page(&self) -> Result<(), EntitlementError>;
}

/// Configuration for the hosted entitlement service client
#[derive(Debug, Clone)]
pub struct HttpPaymentProviderConfig {
    /// Service origin, e.g. `https://pay.example.com`
    pub base_url: String,
    /// Project identifier issued by the vendor
    pub project_id: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// HTTP client for the hosted entitlement service
pub struct HttpPaymentProvider {
    client: reqwest::Client,
    config: HttpPaymentProviderConfig,
    opener: Arc<dyn PageOpener>,
}

impl HttpPaymentProvider {
    pub fn new(
        config: HttpPaymentProviderConfig,
        opener: Arc<dyn PageOpener>,
    ) -> Result<Self, EntitlementError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| EntitlementError::CallFailed { reason: e.to_string() })?;
        Ok(Self { client, config, opener })
    }

    fn user_endpoint(&self) -> String {
        format!(
            "{}/api/v1/projects/{}/user",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    fn checkout_url(&self) -> String {
        format!(
            "{}/checkout/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn fetch_user(&self) -> Result<Value, EntitlementError> {
        let endpoint = self.user_endpoint();
        debug!(%endpoint, "fetching entitlement record");

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| EntitlementError::CallFailed { reason: e.to_string() })?
            .error_for_status()
            .map_err(|e| EntitlementError::CallFailed { reason: e.to_string() })?;

        response
            .json::<Value>()
            .await
            .map_err(|e| EntitlementError::CallFailed { reason: e.to_string() })
    }

    async fn open_payment_page(&self) -> Result<(), EntitlementError> {
        let url = self.checkout_url();
        info!(%url, "opening checkout page");
        self.opener.open(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct RecordingOpener {
        pub opened: Mutex<Vec<String>>,
    }

    impl RecordingOpener {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self { opened: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl PageOpener for RecordingOpener {
        async fn open(&self, url: &str) -> Result<(), EntitlementError> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn provider() -> HttpPaymentProvider {
        HttpPaymentProvider::new(
            HttpPaymentProviderConfig {
                base_url: "https://pay.example.com/".to_string(),
                project_id: "proj_123".to_string(),
                request_timeout_ms: 1_000,
            },
            RecordingOpener::new(),
        )
        .unwrap()
    }

    #[test]
    fn endpoints_are_built_from_config() {
        let provider = provider();
        assert_eq!(
            provider.user_endpoint(),
            "https://pay.example.com/api/v1/projects/proj_123/user"
        );
        assert_eq!(provider.checkout_url(), "https://pay.example.com/checkout/proj_123");
    }

    #[tokio::test]
    async fn open_payment_page_delegates_to_the_opener() {
        let opener = RecordingOpener::new();
        let provider = HttpPaymentProvider::new(
            HttpPaymentProviderConfig {
                base_url: "https://pay.example.com".to_string(),
                project_id: "proj_123".to_string(),
                request_timeout_ms: 1_000,
            },
            opener.clone(),
        )
        .unwrap();

        provider.open_payment_page().await.unwrap();
        assert_eq!(
            *opener.opened.lock().unwrap(),
            vec!["https://pay.example.com/checkout/proj_123".to_string()]
        );
    }
}
