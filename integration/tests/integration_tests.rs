//! End-to-end flows: scan a document, stream updates, and run gated
//! download batches against stub and scripted payment backends.

use async_trait::async_trait;
use entitlements::{
    InProcessBus, KeyValueStore, LicenseConfig, MemoryKeyValueStore, PageOpener, PaymentBackend,
    PaymentProvider, FREE_DAILY_LIMIT,
};
use integration::{Downloader, MediaSession};
use page_media_core::{
    BusMessage, DownloadError, DownloadFormat, DownloadRequest, EntitlementError, FeedMessage,
    MediaItem, MediaKind, ScanRequest, ScanResponse,
};
use page_scanner::DomMutation;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

struct RecordingDownloader {
    requests: Mutex<Vec<DownloadRequest>>,
    fail_sources: Vec<String>,
}

impl RecordingDownloader {
    fn new() -> Arc<Self> {
        Arc::new(Self { requests: Mutex::new(Vec::new()), fail_sources: Vec::new() })
    }

    fn failing_on(sources: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            fail_sources: sources.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn recorded(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        if self.fail_sources.contains(&request.source) {
            return Err(DownloadError::Rejected { reason: "blocked by server".to_string() });
        }
        self.requests.lock().unwrap().push(request.clone());
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

struct PaidProvider;

#[async_trait]
impl PaymentProvider for PaidProvider {
    async fn fetch_user(&self) -> Result<Value, EntitlementError> {
        Ok(json!({ "paid": true }))
    }

    async fn open_payment_page(&self) -> Result<(), EntitlementError> {
        Ok(())
    }
}

fn stub_session(downloader: Arc<RecordingDownloader>) -> MediaSession {
    MediaSession::new(
        PaymentBackend::Stub,
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(InProcessBus::default()),
        Arc::new(NullOpener),
        downloader,
    )
}

const PAGE: &str = r#"
    <img src="photos/a.jpg">
    <img data-src="photos/b.jpg">
    <div style="background-image: url(photos/c.jpg)"></div>
    <video src="clips/v.mp4" poster="photos/poster.jpg"></video>
"#;

#[tokio::test]
async fn scan_merge_and_feed_round_trip() {
    let session = stub_session(RecordingDownloader::new());
    session
        .load_document(PAGE, "https://example.com/")
        .expect("recompute scheduled")
        .await
        .unwrap();

    // Request/response path.
    let media = match session.handle(&ScanRequest::GetMedia) {
        ScanResponse::Media { ok, media } => {
            assert!(ok);
            media
        }
        other => panic!("unexpected response: {other:?}"),
    };
    assert_eq!(media.len(), 5);
    let poster = media.iter().find(|i| i.url.ends_with("poster.jpg")).unwrap();
    assert_eq!(poster.kind, MediaKind::Video);

    // Feed path: initial snapshot on subscribe, then a coalesced update
    // after the document changes.
    let (_id, mut rx) = session.subscribe_media_feed().await;
    let FeedMessage::MediaUpdate { media: initial } = rx.recv().await.unwrap();
    assert_eq!(initial.len(), 5);

    session
        .load_document(r#"<img src="only.png">"#, "https://example.com/")
        .expect("recompute scheduled")
        .await
        .unwrap();
    let FeedMessage::MediaUpdate { media: updated } = rx.recv().await.unwrap();
    assert_eq!(updated.len(), 1);
    assert!(updated[0].url.ends_with("only.png"));
}

#[tokio::test]
async fn unwatched_mutations_do_not_recompute() {
    let session = stub_session(RecordingDownloader::new());
    session
        .load_document(PAGE, "https://example.com/")
        .expect("recompute scheduled")
        .await
        .unwrap();

    assert!(session
        .document_mutated(&DomMutation::Attribute("class".to_string()))
        .is_none());
    assert!(session
        .document_mutated(&DomMutation::Attribute("srcset".to_string()))
        .is_some());
}

#[tokio::test]
async fn unpaid_batch_stops_at_the_daily_limit() {
    let downloader = RecordingDownloader::new();
    let session = stub_session(downloader.clone());

    let items: Vec<MediaItem> = (0..7)
        .map(|n| MediaItem::image(format!("https://example.com/pic{n}.png")))
        .collect();

    let outcome = session.download_selected(&items, DownloadFormat::Original).await;
    assert_eq!(outcome.completed, FREE_DAILY_LIMIT as usize);
    assert_eq!(outcome.total, 7);
    assert!(outcome.quota_exhausted);
    assert_eq!(downloader.recorded().len(), FREE_DAILY_LIMIT as usize);
    assert_eq!(session.remaining_daily_quota().await, 0);
}

#[tokio::test]
async fn videos_download_even_when_quota_is_gone() {
    let downloader = RecordingDownloader::new();
    let session = stub_session(downloader.clone());

    let images: Vec<MediaItem> = (0..FREE_DAILY_LIMIT)
        .map(|n| MediaItem::image(format!("https://example.com/pic{n}.png")))
        .collect();
    session.download_selected(&images, DownloadFormat::Original).await;
    assert_eq!(session.remaining_daily_quota().await, 0);

    let videos = vec![MediaItem::video("https://example.com/clip.mp4")];
    let outcome = session.download_selected(&videos, DownloadFormat::Original).await;
    assert_eq!(outcome.completed, 1);
    assert!(!outcome.quota_exhausted);
    assert_eq!(session.remaining_daily_quota().await, 0);
}

#[tokio::test]
async fn paid_license_lifts_the_meter() {
    let downloader = RecordingDownloader::new();
    let session = MediaSession::new(
        PaymentBackend::Remote(Arc::new(PaidProvider)),
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(InProcessBus::default()),
        Arc::new(NullOpener),
        downloader.clone(),
    );

    assert!(session.activation_info().await.active);

    let items: Vec<MediaItem> = (0..8)
        .map(|n| MediaItem::image(format!("https://example.com/pic{n}.png")))
        .collect();
    let outcome = session.download_selected(&items, DownloadFormat::Original).await;
    assert_eq!(outcome.completed, 8);
    assert!(!outcome.quota_exhausted);
    assert_eq!(session.remaining_daily_quota().await, FREE_DAILY_LIMIT);
}

#[tokio::test]
async fn jpeg_batches_rewrite_image_names_only() {
    let downloader = RecordingDownloader::new();
    let session = stub_session(downloader.clone());

    let items = vec![
        MediaItem::image("https://example.com/photos/cat.png"),
        MediaItem::video("https://example.com/clips/dog.mp4"),
    ];
    session
        .download_selected(&items, DownloadFormat::Jpeg { quality: 0.92 })
        .await;

    let recorded = downloader.recorded();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].suggested_filename, "cat.jpg");
    assert!(recorded[0].transcode_to_jpeg);
    assert_eq!(recorded[1].suggested_filename, "dog.mp4");
    assert!(!recorded[1].transcode_to_jpeg);
}

#[tokio::test]
async fn failed_items_are_skipped_without_charge() {
    let downloader = RecordingDownloader::failing_on(&["https://example.com/pic1.png"]);
    let session = stub_session(downloader.clone());

    let items = vec![
        MediaItem::image("https://example.com/pic0.png"),
        MediaItem::image("https://example.com/pic1.png"),
        MediaItem::image("https://example.com/pic2.png"),
    ];
    let outcome = session.download_selected(&items, DownloadFormat::Original).await;

    assert_eq!(outcome.completed, 2);
    assert!(!outcome.quota_exhausted);
    // Only the two accepted items consumed quota.
    assert_eq!(session.remaining_daily_quota().await, FREE_DAILY_LIMIT - 2);
}

#[tokio::test]
async fn payment_detection_broadcasts_and_caches() {
    let store: Arc<MemoryKeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let bus = Arc::new(InProcessBus::default());
    let mut receiver = bus.subscribe();

    let session = MediaSession::with_license_config(
        PaymentBackend::Remote(Arc::new(PaidProvider)),
        store.clone(),
        bus,
        Arc::new(NullOpener),
        RecordingDownloader::new(),
        LicenseConfig {
            poll_timeout_ms: 1_000,
            poll_interval_ms: 1,
            min_poll_interval_ms: 1,
            ..LicenseConfig::default()
        },
    );

    assert!(session.refresh_license(1_000, 1).await);
    assert!(matches!(
        receiver.recv().await,
        Ok(BusMessage::LicenseChanged { user: Some(_) })
    ));
    assert_eq!(
        store.get(entitlements::keys::LICENSE_PAID).await.unwrap(),
        Some(json!(true))
    );
}
