use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::domain::{cache_key, Post};
use crate::errors::{FeederError, FeederResult};
use crate::services::fetch_service::FetchService;
use crate::sources::ListingSource;

pub type SharedPosts = Arc<Vec<Post>>;

type FetchOutcome = Result<(SharedPosts, Instant), String>;
type InFlight = Shared<BoxFuture<'static, FetchOutcome>>;

/// Posts served from the cache for one channel key
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub key: String,
    pub posts: SharedPosts,
    pub fetched_at: Instant,
    pub is_stale: bool,
}

struct CacheEntry {
    posts: SharedPosts,
    fetched_at: Instant,
    invalidated: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    /// Bumped by every invalidation. Fetches started under an older
    /// epoch do not write their result back.
    epoch: u64,
}

impl CacheState {
    fn insert(&mut self, key: String, entry: CacheEntry, capacity: usize) {
        if !self.entries.contains_key(&key) && self.entries.len() >= capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.fetched_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(key = %oldest, "evicting cache entry");
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, entry);
    }
}

struct Inner<S: ListingSource> {
    fetcher: FetchService<S>,
    state: Mutex<CacheState>,
    stale_after: Duration,
    capacity: usize,
}

/// Keyed post cache in front of a [`FetchService`].
///
/// Keys are order-independent channel lists. At most one fetch per key
/// runs at a time; callers asking for a key that is already being
/// fetched wait for that fetch. Stale entries are served immediately
/// while a refetch runs in the background.
pub struct FeedCache<S: ListingSource> {
    inner: Arc<Inner<S>>,
}

impl<S: ListingSource> Clone for FeedCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ListingSource + 'static> FeedCache<S> {
    pub fn new(fetcher: FetchService<S>, stale_after: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                state: Mutex::new(CacheState::default()),
                stale_after,
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.inner.stale_after
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_entry(&self, key: &str, entry: &CacheEntry) -> CacheRead {
        CacheRead {
            key: key.to_string(),
            posts: Arc::clone(&entry.posts),
            fetched_at: entry.fetched_at,
            is_stale: entry.invalidated || entry.fetched_at.elapsed() >= self.inner.stale_after,
        }
    }

    /// Cached posts for a key, without triggering any fetch
    pub fn peek(&self, key: &str) -> Option<CacheRead> {
        let state = self.lock_state();
        state.entries.get(key).map(|entry| self.read_entry(key, entry))
    }

    pub fn is_fetching(&self, key: &str) -> bool {
        self.lock_state().in_flight.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serve posts for `channels`.
    ///
    /// Fresh entries are returned as is. Stale entries are returned
    /// immediately and refreshed in the background. A miss waits for a
    /// (possibly shared) fetch.
    pub async fn read<C: AsRef<str>>(
        &self,
        channels: &[C],
        limit_per_channel: u32,
    ) -> FeederResult<CacheRead> {
        let key = cache_key(channels);

        let cached = self.peek(&key);
        match cached {
            Some(read) if !read.is_stale => {
                tracing::debug!(key = %key, "cache hit");
                Ok(read)
            }
            Some(read) => {
                tracing::debug!(key = %key, "serving stale entry, refreshing in background");
                self.spawn_refresh(channels, limit_per_channel);
                Ok(read)
            }
            None => {
                tracing::debug!(key = %key, "cache miss");
                self.fetch(channels, limit_per_channel).await
            }
        }
    }

    /// Refetch `channels` now, joining a fetch already running for the key.
    pub async fn fetch<C: AsRef<str>>(
        &self,
        channels: &[C],
        limit_per_channel: u32,
    ) -> FeederResult<CacheRead> {
        let key = cache_key(channels);
        let pending = self.start_or_join(&key, channels, limit_per_channel);

        let (posts, fetched_at) = pending.await.map_err(FeederError::Fetch)?;
        Ok(CacheRead {
            key,
            posts,
            fetched_at,
            is_stale: false,
        })
    }

    /// Mark every entry stale. Fetches already running keep serving their
    /// waiters but no longer populate the cache.
    ///
    /// A [`fetch`](Self::fetch) for the same key issued after this call joins
    /// such a running fetch instead of starting a new one. It gets that
    /// result, nothing is cached, and the next read fetches again.
    pub fn invalidate_all(&self) {
        let mut state = self.lock_state();
        state.epoch += 1;
        for entry in state.entries.values_mut() {
            entry.invalidated = true;
        }
        tracing::debug!(epoch = state.epoch, "invalidated feed cache");
    }

    fn spawn_refresh<C: AsRef<str>>(&self, channels: &[C], limit_per_channel: u32) {
        let key = cache_key(channels);
        let pending = self.start_or_join(&key, channels, limit_per_channel);

        tokio::spawn(async move {
            if let Err(e) = pending.await {
                tracing::warn!(key = %key, error = %e, "background refresh failed");
            }
        });
    }

    fn start_or_join<C: AsRef<str>>(
        &self,
        key: &str,
        channels: &[C],
        limit_per_channel: u32,
    ) -> InFlight {
        let mut state = self.lock_state();

        if let Some(pending) = state.in_flight.get(key) {
            tracing::debug!(key = %key, "joining in-flight fetch");
            return pending.clone();
        }

        let epoch = state.epoch;
        let cache = self.clone();
        let owned_key = key.to_string();
        let channels: Vec<String> = channels.iter().map(|c| c.as_ref().to_string()).collect();

        // Spawned so the fetch completes even if every waiter goes away
        let task = tokio::spawn(async move {
            cache
                .run_fetch(owned_key, channels, limit_per_channel, epoch)
                .await
        });
        let pending = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(format!("fetch task failed: {}", e)),
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(key.to_string(), pending.clone());
        pending
    }

    async fn run_fetch(
        &self,
        key: String,
        channels: Vec<String>,
        limit_per_channel: u32,
        epoch: u64,
    ) -> FetchOutcome {
        let result = self
            .inner
            .fetcher
            .fetch_posts(&channels, limit_per_channel)
            .await;

        let mut state = self.lock_state();
        state.in_flight.remove(&key);

        let posts = Arc::new(result.map_err(|e| e.to_string())?);
        let fetched_at = Instant::now();

        if state.epoch == epoch {
            let entry = CacheEntry {
                posts: Arc::clone(&posts),
                fetched_at,
                invalidated: false,
            };
            state.insert(key, entry, self.inner.capacity);
        } else {
            tracing::debug!(key = %key, "discarding response fetched before invalidation");
        }

        Ok((posts, fetched_at))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Listing source that counts requests and answers after `delay`
    #[derive(Clone)]
    pub(crate) struct CountingSource {
        pub calls: Arc<AtomicUsize>,
        pub delay: Duration,
    }

    impl CountingSource {
        pub fn new(delay: Duration) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                delay,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ListingSource for CountingSource {
        async fn hot_posts(&self, channel: &str, limit: u32) -> FeederResult<Vec<Post>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok((0..limit)
                .map(|i| {
                    Post::new(
                        format!("{}-{}-{}", channel, call, i),
                        format!("Post {}", i),
                        channel.to_string(),
                    )
                })
                .collect())
        }
    }

    const STALE: Duration = Duration::from_secs(120);

    fn setup(delay: Duration, capacity: usize) -> (CountingSource, FeedCache<CountingSource>) {
        let source = CountingSource::new(delay);
        let cache = FeedCache::new(FetchService::new(source.clone()), STALE, capacity);
        (source, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_reads_within_window_fetch_once() {
        let (source, cache) = setup(Duration::from_millis(100), 16);

        let first = cache.read(&["rust"], 5).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache.read(&["rust"], 5).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(!second.is_stale);
        assert!(Arc::ptr_eq(&first.posts, &second.posts));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reordered_channels_share_entry() {
        let (source, cache) = setup(Duration::from_millis(100), 16);

        let first = cache.read(&["rust", "golang"], 2).await.unwrap();
        let second = cache.read(&["golang", "rust"], 2).await.unwrap();

        assert_eq!(first.key, "golang,rust");
        assert_eq!(second.key, "golang,rust");
        // One request per channel, made once
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_are_coalesced() {
        let (source, cache) = setup(Duration::from_secs(1), 16);

        let (a, b, c) = tokio::join!(
            cache.read(&["rust"], 3),
            cache.read(&["rust"], 3),
            cache.fetch(&["rust"], 3),
        );

        assert_eq!(source.calls(), 1);
        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a.posts, &b.unwrap().posts));
        assert!(Arc::ptr_eq(&a.posts, &c.unwrap().posts));
        assert!(!cache.is_fetching("rust"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_served_then_refreshed() {
        let (source, cache) = setup(Duration::from_millis(100), 16);

        let first = cache.read(&["rust"], 1).await.unwrap();
        tokio::time::advance(STALE + Duration::from_secs(1)).await;

        let stale = cache.read(&["rust"], 1).await.unwrap();
        assert!(stale.is_stale);
        assert!(Arc::ptr_eq(&first.posts, &stale.posts));

        // Let the background refresh finish
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(source.calls(), 2);
        let fresh = cache.peek("rust").unwrap();
        assert!(!fresh.is_stale);
        assert_eq!(fresh.posts[0].id, "rust-1-0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_marks_entries_stale() {
        let (source, cache) = setup(Duration::from_millis(100), 16);

        cache.read(&["rust"], 1).await.unwrap();
        cache.invalidate_all();

        assert!(cache.peek("rust").unwrap().is_stale);
        let read = cache.read(&["rust"], 1).await.unwrap();
        assert!(read.is_stale);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 2);
        assert!(!cache.peek("rust").unwrap().is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_racing_invalidation_is_not_cached() {
        let (_source, cache) = setup(Duration::from_secs(1), 16);

        let handle = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(&["rust"], 2).await }
        });
        tokio::task::yield_now().await;
        assert!(cache.is_fetching("rust"));

        cache.invalidate_all();
        let read = handle.await.unwrap().unwrap();

        assert_eq!(read.posts.len(), 2);
        assert!(cache.peek("rust").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_after_invalidation_joins_running_fetch() {
        let (source, cache) = setup(Duration::from_secs(1), 16);

        let first = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(&["rust"], 2).await }
        });
        tokio::task::yield_now().await;

        cache.invalidate_all();
        let joined = cache.fetch(&["rust"], 2).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first.posts, &joined.posts));
        assert!(cache.peek("rust").is_none());

        cache.read(&["rust"], 2).await.unwrap();
        assert_eq!(source.calls(), 2);
        assert!(cache.peek("rust").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest_key() {
        let (_source, cache) = setup(Duration::from_millis(10), 2);

        cache.read(&["a"], 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.read(&["b"], 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.read(&["c"], 1).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.peek("a").is_none());
        assert!(cache.peek("b").is_some());
        assert!(cache.peek("c").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_surfaces_and_clears_in_flight() {
        let (_source, cache) = setup(Duration::from_millis(10), 16);

        let result = cache.read(&["rust"], 0).await;

        assert!(matches!(result, Err(FeederError::Fetch(_))));
        assert!(!cache.is_fetching("rust"));
        assert!(cache.is_empty());
    }
}
