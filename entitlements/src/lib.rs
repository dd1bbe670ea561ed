//! Quota and license gating
//!
//! Decides, per requested download, whether the action is permitted and
//! whether it consumes the daily free quota. Entitlement state comes
//! from a remote payment backend and degrades to "unpaid" on every
//! failure path; the quota counter lives in local key-value storage
//! scoped to the rolling local calendar day.

pub mod storage;
pub mod bus;
pub mod quota;
pub mod provider;
pub mod license;
pub mod gate;

pub use storage::{keys, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use bus::{ContextBus, InProcessBus};
pub use quota::{QuotaStore, FREE_DAILY_LIMIT};
pub use provider::{HttpPaymentProvider, HttpPaymentProviderConfig, PageOpener, PaymentProvider};
pub use license::{LicenseConfig, LicenseGateway, PaymentBackend};
pub use gate::{GateDecision, UsageGate};
