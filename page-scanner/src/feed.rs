//! Live media feed
//!
//! Pushes fresh snapshots to long-lived subscribers without flooding
//! them during bursts of document activity. Triggers coalesce onto a
//! frame interval: however many arrive within one frame, at most one
//! recompute-and-broadcast runs, guarded by a single in-flight flag.

use page_media_core::{FeedMessage, MediaItem, Uuid};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Attribute changes that can alter the media set
const WATCHED_ATTRIBUTES: &[&str] = &["src", "srcset", "style", "poster"];

/// Producer of complete deduplicated snapshots
pub trait MediaSource: Send + Sync {
    fn collect(&self) -> Vec<MediaItem>;
}

/// Document-side triggers the feed reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomMutation {
    /// Nodes were added or removed somewhere in the subtree
    ChildList,
    /// A named attribute changed on some element
    Attribute(String),
}

impl DomMutation {
    /// Whether this mutation can affect a scan result
    pub fn is_watched(&self) -> bool {
        match self {
            DomMutation::ChildList => true,
            DomMutation::Attribute(name) => WATCHED_ATTRIBUTES
                .iter()
                .any(|watched| name.eq_ignore_ascii_case(watched)),
        }
    }
}

/// Configuration for the media feed
#[derive(Debug, Clone)]
pub struct MediaFeedConfig {
    /// Coalescing window, animation-frame granularity
    pub frame_interval_ms: u64,
    /// Per-subscriber channel capacity
    pub channel_capacity: usize,
}

impl Default for MediaFeedConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            channel_capacity: 32,
        }
    }
}

/// Change notifier holding the subscriber set and the coalescing state
///
/// Subscriber registry and the in-flight flag are private to the feed;
/// the lifecycle is explicit via [`start`](Self::start) /
/// [`stop`](Self::stop). A stopped feed accepts subscriptions (each
/// still gets its initial snapshot) but schedules no recomputes.
pub struct MediaFeed {
    source: Arc<dyn MediaSource>,
    subscribers: Arc<RwLock<HashMap<Uuid, mpsc::Sender<FeedMessage>>>>,
    recompute_scheduled: Arc<AtomicBool>,
    load_fired: AtomicBool,
    running: AtomicBool,
    config: MediaFeedConfig,
}

impl MediaFeed {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self::with_config(source, MediaFeedConfig::default())
    }

    pub fn with_config(source: Arc<dyn MediaSource>, config: MediaFeedConfig) -> Self {
        Self {
            source,
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            recompute_scheduled: Arc::new(AtomicBool::new(false)),
            load_fired: AtomicBool::new(false),
            running: AtomicBool::new(false),
            config,
        }
    }

    /// Begin reacting to triggers
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        debug!("media feed started");
    }

    /// Stop reacting to triggers; subscribers stay registered
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        debug!("media feed stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register a persistent subscriber
    ///
    /// The initial snapshot is collected synchronously at subscribe time
    /// and is already queued on the returned receiver.
    pub async fn subscribe(&self) -> (Uuid, mpsc::Receiver<FeedMessage>) {
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        let snapshot = self.source.collect();
        // Fresh channel; the initial send cannot fail.
        let _ = sender.try_send(FeedMessage::MediaUpdate { media: snapshot });

        let id = Uuid::new_v4();
        self.subscribers.write().await.insert(id, sender);
        debug!(subscriber = %id, "feed subscriber registered");
        (id, receiver)
    }

    /// Remove a subscriber; no further deliveries are attempted
    pub async fn unsubscribe(&self, id: Uuid) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!(subscriber = %id, "feed subscriber removed");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// React to a document mutation
    ///
    /// Unwatched attribute changes are ignored. Returns the handle of
    /// the coalesced recompute when this call scheduled one.
    pub fn document_mutated(&self, mutation: &DomMutation) -> Option<JoinHandle<()>> {
        if !mutation.is_watched() {
            return None;
        }
        self.schedule_recompute()
    }

    /// React to the document's load-completion event; fires at most once
    pub fn load_complete(&self) -> Option<JoinHandle<()>> {
        if self.load_fired.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.schedule_recompute()
    }

    /// Coalesce triggers onto the next frame
    ///
    /// The in-flight flag guarantees a pending computation is never
    /// scheduled twice; it clears just before the broadcast so the next
    /// trigger can schedule the frame after.
    fn schedule_recompute(&self) -> Option<JoinHandle<()>> {
        if !self.is_running() {
            return None;
        }
        if self.recompute_scheduled.swap(true, Ordering::SeqCst) {
            return None;
        }

        let source = Arc::clone(&self.source);
        let subscribers = Arc::clone(&self.subscribers);
        let flag = Arc::clone(&self.recompute_scheduled);
        let delay = Duration::from_millis(self.config.frame_interval_ms);

        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(false, Ordering::SeqCst);
            Self::broadcast_snapshot(&source, &subscribers).await;
        }))
    }

    /// Collect one snapshot and deliver it to every live subscriber
    ///
    /// A subscriber whose channel is closed or saturated is removed;
    /// delivery to the remaining subscribers continues unaffected.
    async fn broadcast_snapshot(
        source: &Arc<dyn MediaSource>,
        subscribers: &Arc<RwLock<HashMap<Uuid, mpsc::Sender<FeedMessage>>>>,
    ) {
        let payload = FeedMessage::MediaUpdate {
            media: source.collect(),
        };

        let mut registry = subscribers.write().await;
        registry.retain(|id, sender| match sender.try_send(payload.clone()) {
            Ok(()) => true,
            Err(err) => {
                warn!(subscriber = %id, %err, "dropping feed subscriber");
                false
            }
        });
    }
}
