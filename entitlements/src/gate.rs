//! Usage gate
//!
//! Combines the quota counter with the license gateway to answer, per
//! requested download, "is this permitted, and does it cost quota?".
//! Product policy: only image downloads are metered. Videos are never
//! charged and never blocked, whatever the license state.

use crate::license::LicenseGateway;
use crate::quota::QuotaStore;
use page_media_core::MediaKind;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a single gate consultation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    /// Whether the download may proceed
    pub permitted: bool,
    /// Whether an active entitlement made the decision
    pub active: bool,
    /// Remaining free quota, when it was consulted
    pub remaining: Option<u32>,
}

/// Per-download permission and charging policy
pub struct UsageGate {
    quota: Arc<QuotaStore>,
    license: Arc<LicenseGateway>,
}

impl UsageGate {
    pub fn new(quota: Arc<QuotaStore>, license: Arc<LicenseGateway>) -> Self {
        Self { quota, license }
    }

    /// Decide whether a download of `kind` may start
    ///
    /// Images consult the live activation state and, when inactive, the
    /// remaining quota. Videos pass without consulting either.
    pub async fn check(&self, kind: MediaKind) -> GateDecision {
        if kind == MediaKind::Video {
            return GateDecision { permitted: true, active: false, remaining: None };
        }

        let info = self.license.get_activation_info().await;
        if info.active {
            return GateDecision { permitted: true, active: true, remaining: None };
        }

        let remaining = self.quota.remaining_daily_quota().await;
        let decision = GateDecision {
            permitted: remaining > 0,
            active: false,
            remaining: Some(remaining),
        };
        if !decision.permitted {
            info!("free quota exhausted; download denied");
        }
        decision
    }

    /// Remaining free quota, without deciding anything
    pub async fn check_remaining(&self) -> u32 {
        self.quota.remaining_daily_quota().await
    }

    /// Charge for a download that the caller confirmed succeeded
    ///
    /// Re-reads the activation state so a purchase completed mid-batch
    /// stops the metering immediately. Returns the remaining quota.
    pub async fn settle(&self, kind: MediaKind) -> u32 {
        if kind == MediaKind::Video {
            return self.quota.remaining_daily_quota().await;
        }

        let info = self.license.get_activation_info().await;
        if info.active {
            debug!("active entitlement; no quota charged");
            return self.quota.remaining_daily_quota().await;
        }

        self.quota.consume_one().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ContextBus, InProcessBus};
    use crate::license::{LicenseConfig, PaymentBackend};
    use crate::provider::{PageOpener, PaymentProvider};
    use crate::quota::FREE_DAILY_LIMIT;
    use crate::storage::MemoryKeyValueStore;
    use async_trait::async_trait;
    use page_media_core::EntitlementError;
    use serde_json::{json, Value};

    struct FixedProvider {
        paid: bool,
    }

    #[async_trait]
    impl PaymentProvider for FixedProvider {
        async fn fetch_user(&self) -> Result<Value, EntitlementError> {
            Ok(json!({ "paid": self.paid }))
        }

        async fn open_payment_page(&self) -> Result<(), EntitlementError> {
            Ok(())
        }
    }

    struct NullOpener;

    #[async_trait]
    impl PageOpener for NullOpener {
        async fn open(&self, _url: &str) -> Result<(), EntitlementError> {
            Ok(())
        }
    }

    fn gate_with(paid: bool) -> UsageGate {
        let store = Arc::new(MemoryKeyValueStore::new());
        let bus: Arc<dyn ContextBus> = Arc::new(InProcessBus::default());
        let license = Arc::new(LicenseGateway::with_config(
            PaymentBackend::Remote(Arc::new(FixedProvider { paid })),
            store.clone(),
            bus,
            Arc::new(NullOpener),
            LicenseConfig::default(),
        ));
        UsageGate::new(Arc::new(QuotaStore::new(store)), license)
    }

    #[tokio::test]
    async fn active_license_permits_without_charging() {
        let gate = gate_with(true);

        let decision = gate.check(MediaKind::Image).await;
        assert!(decision.permitted);
        assert!(decision.active);
        assert_eq!(decision.remaining, None);

        assert_eq!(gate.settle(MediaKind::Image).await, FREE_DAILY_LIMIT);
        assert_eq!(gate.settle(MediaKind::Image).await, FREE_DAILY_LIMIT);
    }

    #[tokio::test]
    async fn inactive_license_meters_images() {
        let gate = gate_with(false);

        let decision = gate.check(MediaKind::Image).await;
        assert!(decision.permitted);
        assert!(!decision.active);
        assert_eq!(decision.remaining, Some(FREE_DAILY_LIMIT));

        assert_eq!(gate.settle(MediaKind::Image).await, FREE_DAILY_LIMIT - 1);
    }

    #[tokio::test]
    async fn exhausted_quota_denies_images() {
        let gate = gate_with(false);
        for _ in 0..FREE_DAILY_LIMIT {
            gate.settle(MediaKind::Image).await;
        }

        let decision = gate.check(MediaKind::Image).await;
        assert!(!decision.permitted);
        assert_eq!(decision.remaining, Some(0));
    }

    #[tokio::test]
    async fn videos_bypass_license_and_quota() {
        let gate = gate_with(false);
        for _ in 0..FREE_DAILY_LIMIT {
            gate.settle(MediaKind::Image).await;
        }

        // Even with zero remaining, videos pass and cost nothing.
        let decision = gate.check(MediaKind::Video).await;
        assert!(decision.permitted);
        assert_eq!(decision.remaining, None);
        assert_eq!(gate.settle(MediaKind::Video).await, 0);
    }
}
