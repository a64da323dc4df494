use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::cache_key;
use crate::errors::FeederResult;
use crate::services::feed_cache::{CacheRead, FeedCache, SharedPosts};
use crate::sources::ListingSource;

/// What a consumer of the poller sees for the current channel list
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub key: String,
    pub channels: Vec<String>,
    pub data: Option<SharedPosts>,
    pub fetched_at: Option<Instant>,
    pub is_loading: bool,
    pub error: Option<String>,
    stale_after: Duration,
}

impl FeedSnapshot {
    fn loading(channels: Vec<String>, stale_after: Duration) -> Self {
        Self {
            key: cache_key(&channels),
            channels,
            data: None,
            fetched_at: None,
            is_loading: true,
            error: None,
            stale_after,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Data is present but older than the staleness window
    pub fn is_stale(&self) -> bool {
        self.fetched_at
            .map(|at| at.elapsed() >= self.stale_after)
            .unwrap_or(false)
    }
}

/// Supplies the per-channel post limit, asked again before every fetch.
pub type LimitProvider = Box<dyn Fn() -> u32 + Send + Sync>;

/// Keeps a channel list's posts fresh.
///
/// Exactly two events schedule a fetch: the channel key changing and the
/// refresh timer ticking. Both go through the shared [`FeedCache`].
pub struct FeedPoller<S: ListingSource> {
    cache: FeedCache<S>,
    refetch_interval: Duration,
    limit_per_channel: LimitProvider,
}

impl<S: ListingSource + 'static> FeedPoller<S> {
    pub fn new<L>(cache: FeedCache<S>, refetch_interval: Duration, limit_per_channel: L) -> Self
    where
        L: Fn() -> u32 + Send + Sync + 'static,
    {
        Self {
            cache,
            refetch_interval,
            limit_per_channel: Box::new(limit_per_channel),
        }
    }

    /// Start polling the channel list published by `channels`.
    pub fn spawn(self, mut channels: watch::Receiver<Vec<String>>) -> PollerHandle {
        let initial = channels.borrow_and_update().clone();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(FeedSnapshot::loading(initial, self.cache.stale_after()));

        let task = tokio::spawn(self.run(channels, snapshot_tx));

        PollerHandle {
            snapshots: snapshot_rx,
            task,
        }
    }

    async fn run(
        self,
        mut channels_rx: watch::Receiver<Vec<String>>,
        snapshot_tx: watch::Sender<FeedSnapshot>,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        let mut channels = snapshot_tx.borrow().channels.clone();
        let mut key = cache_key(&channels);

        // Nothing cached under another key combination may be served as ours
        self.cache.invalidate_all();
        self.start_fetch(&channels, &done_tx);

        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.refetch_interval,
            self.refetch_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = channels_rx.changed() => {
                    if changed.is_err() {
                        tracing::debug!("channel selection dropped, stopping poller");
                        break;
                    }

                    channels = channels_rx.borrow_and_update().clone();
                    let next_key = cache_key(&channels);
                    if next_key == key {
                        snapshot_tx.send_modify(|s| s.channels = channels.clone());
                        continue;
                    }

                    tracing::info!(from = %key, to = %next_key, "channel key changed");
                    key = next_key;
                    self.cache.invalidate_all();

                    let cached = self.cache.peek(&key);
                    let stale_after = self.cache.stale_after();
                    snapshot_tx.send_replace(FeedSnapshot {
                        key: key.clone(),
                        channels: channels.clone(),
                        data: cached.as_ref().map(|r| r.posts.clone()),
                        fetched_at: cached.as_ref().map(|r| r.fetched_at),
                        is_loading: true,
                        error: None,
                        stale_after,
                    });
                    self.start_fetch(&channels, &done_tx);
                }
                _ = ticker.tick() => {
                    tracing::debug!(key = %key, "refresh timer fired");
                    snapshot_tx.send_modify(|s| s.is_loading = true);
                    self.start_fetch(&channels, &done_tx);
                }
                Some((fetched_key, result)) = done_rx.recv() => {
                    if fetched_key != key {
                        tracing::debug!(key = %fetched_key, "discarding response for superseded key");
                        continue;
                    }
                    apply_result(&snapshot_tx, result);
                }
            }
        }
    }

    fn start_fetch(
        &self,
        channels: &[String],
        done_tx: &mpsc::UnboundedSender<(String, FeederResult<CacheRead>)>,
    ) {
        let cache = self.cache.clone();
        let channels = channels.to_vec();
        let limit = (self.limit_per_channel)();
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let key = cache_key(&channels);
            let result = cache.fetch(&channels, limit).await;
            // The poller may be gone by now
            let _ = done_tx.send((key, result));
        });
    }
}

fn apply_result(snapshot_tx: &watch::Sender<FeedSnapshot>, result: FeederResult<CacheRead>) {
    snapshot_tx.send_modify(|snapshot| {
        snapshot.is_loading = false;
        match result {
            Ok(read) => {
                tracing::info!(key = %read.key, posts = read.posts.len(), "feed updated");
                snapshot.data = Some(read.posts);
                snapshot.fetched_at = Some(read.fetched_at);
                snapshot.error = None;
            }
            Err(e) => {
                tracing::error!(key = %snapshot.key, error = %e, "feed refresh failed");
                snapshot.error = Some(e.to_string());
            }
        }
    });
}

/// Running poller. Dropping it stops polling.
pub struct PollerHandle {
    snapshots: watch::Receiver<FeedSnapshot>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn stop(self) {
        // Drop does the work
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
