//! Media harvesting session
//!
//! One session per scanned page: the document store and scan service
//! answer queries, the feed streams snapshots, and every download runs
//! through the usage gate. Contexts of the same installation share the
//! key-value store and the broadcast bus handed in at construction.

use crate::downloads::{DownloadOutcome, DownloadPlanner, Downloader};
use entitlements::{
    ContextBus, KeyValueStore, LicenseConfig, LicenseGateway, PageOpener, PaymentBackend,
    QuotaStore, UsageGate,
};
use page_media_core::{
    ActivationInfo, DownloadFormat, FeedMessage, MediaItem, ScanRequest, ScanResponse, Uuid,
};
use page_scanner::{DocumentStore, DomMutation, MediaFeed, ScanService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Everything a consumer context needs for one page session
pub struct MediaSession {
    document: Arc<DocumentStore>,
    service: Arc<ScanService>,
    feed: Arc<MediaFeed>,
    license: Arc<LicenseGateway>,
    gate: Arc<UsageGate>,
    planner: DownloadPlanner,
}

impl MediaSession {
    pub fn new(
        backend: PaymentBackend,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn ContextBus>,
        opener: Arc<dyn PageOpener>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self::with_license_config(backend, store, bus, opener, downloader, LicenseConfig::default())
    }

    pub fn with_license_config(
        backend: PaymentBackend,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn ContextBus>,
        opener: Arc<dyn PageOpener>,
        downloader: Arc<dyn Downloader>,
        license_config: LicenseConfig,
    ) -> Self {
        let document = Arc::new(DocumentStore::new());
        let service = Arc::new(ScanService::new(document.clone()));
        let feed = Arc::new(MediaFeed::new(service.clone()));
        feed.start();

        let license = Arc::new(LicenseGateway::with_config(
            backend,
            store.clone(),
            bus,
            opener,
            license_config,
        ));
        let quota = Arc::new(QuotaStore::new(store));
        let gate = Arc::new(UsageGate::new(quota, license.clone()));
        let planner = DownloadPlanner::new(gate.clone(), downloader);

        info!("media session ready");
        Self { document, service, feed, license, gate, planner }
    }

    /// Replace the scanned document and schedule a feed recompute
    pub fn load_document(&self, markup: &str, base_uri: &str) -> Option<JoinHandle<()>> {
        self.document.load(markup, base_uri);
        self.feed.document_mutated(&DomMutation::ChildList)
    }

    /// Answer a scan query against the current document
    pub fn handle(&self, request: &ScanRequest) -> ScanResponse {
        self.service.handle(request)
    }

    /// Attach a live subscriber to the media feed
    pub async fn subscribe_media_feed(&self) -> (Uuid, mpsc::Receiver<FeedMessage>) {
        self.feed.subscribe().await
    }

    /// Forward a document mutation to the feed
    pub fn document_mutated(&self, mutation: &DomMutation) -> Option<JoinHandle<()>> {
        self.feed.document_mutated(mutation)
    }

    /// Forward the load-completion event to the feed
    pub fn load_complete(&self) -> Option<JoinHandle<()>> {
        self.feed.load_complete()
    }

    /// Live activation view for the pay/quota surface
    pub async fn activation_info(&self) -> ActivationInfo {
        self.license.get_activation_info().await
    }

    /// Remaining free downloads today
    pub async fn remaining_daily_quota(&self) -> u32 {
        self.gate.check_remaining().await
    }

    /// Open checkout; a spawned payment poll is returned when one started
    pub async fn open_payment_page(&self) -> Option<JoinHandle<bool>> {
        self.license.open_payment_page().await
    }

    /// Short poll to catch a freshly activated purchase
    pub async fn refresh_license(&self, timeout_ms: u64, interval_ms: u64) -> bool {
        self.license.poll_for_payment_with(timeout_ms, interval_ms).await
    }

    /// Download the selection through the usage gate
    pub async fn download_selected(
        &self,
        items: &[MediaItem],
        format: DownloadFormat,
    ) -> DownloadOutcome {
        self.planner.download_selected(items, format).await
    }

    pub fn feed(&self) -> &Arc<MediaFeed> {
        &self.feed
    }

    pub fn license(&self) -> &Arc<LicenseGateway> {
        &self.license
    }
}
