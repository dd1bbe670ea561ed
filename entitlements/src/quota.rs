//! Daily free-usage quota
//!
//! A soft anti-abuse counter scoped to the rolling local calendar day.
//! The counter resets lazily: a read on a new day sees zero usage, but
//! storage is only rewritten on the next consumption. Storage failures
//! are swallowed; reads fall back to zero usage and failed writes
//! simply fail to persist.
//!
//! There is no cross-context read-modify-write atomicity. Concurrent
//! consumers can lose updates; the underlying store has no transactions
//! and the quota is not a billing-grade ledger.

use crate::storage::{keys, KeyValueStore};
use page_media_core::UsageRecord;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Free downloads per local calendar day
pub const FREE_DAILY_LIMIT: u32 = 5;

/// Owner of the persisted `(quotaDate, quotaCount)` pair
pub struct QuotaStore {
    store: Arc<dyn KeyValueStore>,
}

impl QuotaStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Local-timezone calendar day, zero-padded `YYYY-MM-DD`
    pub fn today() -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }

    /// Current usage, lazily reset across day boundaries
    ///
    /// A persisted record for another date reads as `{today, 0}`
    /// without being rewritten; a count that is not a finite number
    /// reads as zero.
    pub async fn usage(&self) -> UsageRecord {
        let today = Self::today();

        let date = match self.store.get(keys::QUOTA_DATE).await {
            Ok(Some(value)) => value.as_str().map(str::to_string),
            Ok(None) => None,
            Err(err) => {
                warn!(%err, "quota date read failed; assuming fresh day");
                None
            }
        };

        if date.as_deref() != Some(today.as_str()) {
            return UsageRecord { date: today, count: 0 };
        }

        let count = match self.store.get(keys::QUOTA_COUNT).await {
            Ok(Some(value)) => value.as_u64().map(|n| n.min(u32::MAX as u64) as u32).unwrap_or(0),
            Ok(None) => 0,
            Err(err) => {
                warn!(%err, "quota count read failed; assuming zero");
                0
            }
        };

        UsageRecord { date: today, count }
    }

    /// `max(0, FREE_DAILY_LIMIT - count)` for today
    pub async fn remaining_daily_quota(&self) -> u32 {
        let usage = self.usage().await;
        FREE_DAILY_LIMIT.saturating_sub(usage.count)
    }

    /// Charge `n` against today's quota and return the new remainder
    ///
    /// The base count only carries over when the persisted date is
    /// still today; negative `n` refunds down to zero. Persistence
    /// failures leave the previous record in place without retry.
    pub async fn consume_quota(&self, n: i32) -> u32 {
        let usage = self.usage().await;
        let today = Self::today();
        let base = if usage.date == today { usage.count } else { 0 };
        let next = (base as i64 + n as i64).max(0) as u32;

        if let Err(err) = self.store.set(keys::QUOTA_DATE, json!(today)).await {
            warn!(%err, "quota date write failed");
        }
        if let Err(err) = self.store.set(keys::QUOTA_COUNT, json!(next)).await {
            warn!(%err, "quota count write failed");
        }
        debug!(count = next, "quota consumed");

        FREE_DAILY_LIMIT.saturating_sub(next)
    }

    /// Charge a single download
    pub async fn consume_one(&self) -> u32 {
        self.consume_quota(1).await
    }
}
