//! License gateway
//!
//! Wraps the remote entitlement check behind a never-failing surface:
//! every failure path degrades to "unpaid" with a diagnostic marker
//! instead of an error. Payment completion happens in a checkout flow
//! outside our control, so the gateway also offers deadline-bounded
//! polling and a best-effort broadcast that tells every other live
//! context about a transition.

use crate::bus::ContextBus;
use crate::provider::{PageOpener, PaymentProvider};
use crate::storage::{keys, KeyValueStore};
use chrono::{DateTime, Utc};
use page_media_core::{ActivationInfo, BusMessage, Diagnostic, UserStatus};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for polling and the stub fallback page
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    /// Overall polling deadline
    pub poll_timeout_ms: u64,
    /// Spacing between poll attempts
    pub poll_interval_ms: u64,
    /// Lower bound the interval is clamped to
    pub min_poll_interval_ms: u64,
    /// Informational page shown when only the stub backend is present
    pub info_page_url: String,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 180_000,
            poll_interval_ms: 3_000,
            min_poll_interval_ms: 500,
            info_page_url: "pages/payment-info.html".to_string(),
        }
    }
}

/// Which payment integration was wired in at construction time
///
/// Call sites never probe capabilities at runtime; the variant decides
/// everything.
#[derive(Clone)]
pub enum PaymentBackend {
    /// No project id / service configured; every check reads unpaid
    Unconfigured,
    /// Placeholder integration for development builds
    Stub,
    /// Live integration with the hosted entitlement service
    Remote(Arc<dyn PaymentProvider>),
}

impl PaymentBackend {
    fn name(&self) -> &'static str {
        match self {
            PaymentBackend::Unconfigured => "unconfigured",
            PaymentBackend::Stub => "stub",
            PaymentBackend::Remote(_) => "remote",
        }
    }
}

/// Entitlement state machine shared by every caller in this context
pub struct LicenseGateway {
    backend: PaymentBackend,
    store: Arc<dyn KeyValueStore>,
    bus: Arc<dyn ContextBus>,
    opener: Arc<dyn PageOpener>,
    config: LicenseConfig,
}

impl LicenseGateway {
    pub fn new(
        backend: PaymentBackend,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn ContextBus>,
        opener: Arc<dyn PageOpener>,
    ) -> Self {
        Self::with_config(backend, store, bus, opener, LicenseConfig::default())
    }

    pub fn with_config(
        backend: PaymentBackend,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn ContextBus>,
        opener: Arc<dyn PageOpener>,
        config: LicenseConfig,
    ) -> Self {
        info!(backend = backend.name(), "license gateway initialized");
        Self { backend, store, bus, opener, config }
    }

    /// Query the entitlement state; never fails
    ///
    /// Degrades to `paid: false` with a diagnostic on every failure
    /// path: backend missing, call error, or an empty remote payload.
    pub async fn get_user(&self) -> UserStatus {
        match &self.backend {
            PaymentBackend::Unconfigured => {
                warn!("entitlement check without a configured backend");
                UserStatus::unpaid(Diagnostic::NotConfigured)
            }
            PaymentBackend::Stub => UserStatus {
                paid: false,
                diagnostic: None,
                user: Some(json!({ "paid": false })),
            },
            PaymentBackend::Remote(provider) => match provider.fetch_user().await {
                Ok(Value::Null) => UserStatus::unpaid(Diagnostic::EmptyResult),
                Ok(user) => {
                    let paid = user.get("paid").and_then(Value::as_bool).unwrap_or(false);
                    debug!(paid, "entitlement record fetched");
                    UserStatus { paid, diagnostic: None, user: Some(user) }
                }
                Err(err) => {
                    warn!(%err, "entitlement check failed");
                    UserStatus::unpaid(Diagnostic::CallFailed(err.to_string()))
                }
            },
        }
    }

    /// Live activation view derived from [`get_user`](Self::get_user)
    pub async fn get_activation_info(&self) -> ActivationInfo {
        let status = self.get_user().await;
        let expires_at = status
            .user
            .as_ref()
            .and_then(|user| user.get("expiresAt"))
            .and_then(Value::as_i64)
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        ActivationInfo {
            active: status.paid,
            expires_at,
            user: status.user,
        }
    }

    /// Poll until payment is detected or the deadline passes
    ///
    /// Each iteration swallows individual check failures; only the
    /// deadline stops the loop. Returns `true` immediately after the
    /// first paid result, having broadcast the transition exactly once.
    /// There is no external cancellation.
    pub async fn poll_for_payment(&self) -> bool {
        self.poll_for_payment_with(self.config.poll_timeout_ms, self.config.poll_interval_ms)
            .await
    }

    /// [`poll_for_payment`](Self::poll_for_payment) with explicit timings
    pub async fn poll_for_payment_with(&self, timeout_ms: u64, interval_ms: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let interval =
            Duration::from_millis(interval_ms.max(self.config.min_poll_interval_ms));
        info!(timeout_ms, interval_ms, "polling for payment");

        while Instant::now() < deadline {
            let status = self.get_user().await;
            if status.paid {
                info!("payment detected during polling");
                self.broadcast_license_changed(status.user.as_ref()).await;
                return true;
            }
            tokio::time::sleep(interval).await;
        }

        warn!("polling ended without detecting paid status");
        false
    }

    /// Best-effort fan-out of a license transition
    ///
    /// Sends `LICENSE_CHANGED` to every live context and refreshes the
    /// local shadow cache. Both operations are fire-and-forget; neither
    /// failure reaches the caller.
    pub async fn broadcast_license_changed(&self, user: Option<&Value>) {
        let message = BusMessage::LicenseChanged { user: user.cloned() };
        if let Err(err) = self.bus.broadcast(message).await {
            debug!(%err, "license broadcast had no receivers");
        }

        let paid = user
            .and_then(|u| u.get("paid"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if let Err(err) = self.store.set(keys::LICENSE_PAID, json!(paid)).await {
            debug!(%err, "license shadow write failed");
        }
        let now_ms = Utc::now().timestamp_millis();
        if let Err(err) = self.store.set(keys::LICENSE_UPDATED_AT, json!(now_ms)).await {
            debug!(%err, "license shadow timestamp write failed");
        }
    }

    /// Open the checkout (or the local informational page for stubs)
    ///
    /// With a real backend this also starts an unawaited payment poll
    /// so that returning from checkout is detected without user action;
    /// the poll's handle is returned for callers that want to observe
    /// it, with no cancellation implied.
    pub async fn open_payment_page(self: &Arc<Self>) -> Option<JoinHandle<bool>> {
        match &self.backend {
            PaymentBackend::Unconfigured => {
                warn!("payment page requested without a configured backend");
                None
            }
            PaymentBackend::Stub => {
                if let Err(err) = self.opener.open(&self.config.info_page_url).await {
                    warn!(%err, "informational page failed to open");
                }
                None
            }
            PaymentBackend::Remote(provider) => {
                if let Err(err) = provider.open_payment_page().await {
                    warn!(%err, "checkout page failed to open");
                    return None;
                }
                let gateway = Arc::clone(self);
                Some(tokio::spawn(async move { gateway.poll_for_payment().await }))
            }
        }
    }
}
