//! Single-flight response cache.
//!
//! Each key moves through `Pending -> Resolved | Failed` exactly once. While an entry is
//! pending, every caller awaits the same shared handle, so the computation for a key runs at
//! most once for the lifetime of the cache. Failures are cached like successes: a key that
//! failed keeps failing until the cache is dropped. Entries are never evicted.
//!
//! Inside a tokio runtime the computation runs on its own task and settles its entry itself,
//! so it finishes even when every caller has stopped waiting for it. Without a runtime it is
//! driven by whichever caller polls it.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;

use crate::error::{StickerKitError, StickerKitResult};

type SharedComputation<V> = Shared<BoxFuture<'static, StickerKitResult<V>>>;
type EntryMap<K, V> = HashMap<K, CacheEntry<V>>;
type Entries<K, V> = Arc<Mutex<EntryMap<K, V>>>;

enum CacheEntry<V: Clone> {
    Pending(SharedComputation<V>),
    Resolved(V),
    Failed(StickerKitError),
}

/// Observable state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// The computation has started and has not finished yet.
    Pending,
    /// The computation succeeded; its value is cached.
    Resolved,
    /// The computation failed; its error is cached.
    Failed,
}

/// A single-flight memoization map from `K` to `V`.
///
/// `V` is handed out by clone, so it should be cheap to clone (e.g. an `Arc`).
pub struct ResponseCache<K, V: Clone> {
    entries: Entries<K, V>,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the cached outcome for `key`, or runs `compute` to produce it.
    ///
    /// `compute` is only invoked when `key` has never been seen. Concurrent callers with the same
    /// key share the first caller's computation. When called within a tokio runtime, dropping
    /// the returned future does not stop the computation: it runs to completion on a spawned
    /// task and its outcome is cached for later callers.
    ///
    /// # Errors
    ///
    /// Returns the error the computation for `key` failed with, now or earlier.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> StickerKitResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StickerKitResult<V>> + Send + 'static,
    {
        let computation = {
            let mut entries = lock(&self.entries);
            match entries.get(&key) {
                Some(CacheEntry::Resolved(value)) => {
                    log::trace!("cache hit for {key:?}");
                    return Ok(value.clone());
                }
                Some(CacheEntry::Failed(error)) => {
                    log::trace!("cached failure for {key:?}");
                    return Err(error.clone());
                }
                Some(CacheEntry::Pending(computation)) => {
                    log::trace!("joining in-flight computation for {key:?}");
                    computation.clone()
                }
                None => {
                    log::debug!("cache miss for {key:?}");
                    let work = settle_after(Arc::clone(&self.entries), key.clone(), compute());
                    // The spawned task settles under this same lock, so it always finds the
                    // pending entry inserted below.
                    let computation = detach(work);
                    entries.insert(key.clone(), CacheEntry::Pending(computation.clone()));
                    computation
                }
            }
        };

        let outcome = computation.await;
        // Normally a no-op; covers a task that ended without settling its entry.
        settle(&self.entries, &key, &outcome);
        outcome
    }

    /// Returns the state of `key`, if it has an entry.
    #[must_use]
    pub fn state(&self, key: &K) -> Option<EntryState> {
        lock(&self.entries).get(key).map(|entry| match entry {
            CacheEntry::Pending(_) => EntryState::Pending,
            CacheEntry::Resolved(_) => EntryState::Resolved,
            CacheEntry::Failed(_) => EntryState::Failed,
        })
    }

    /// Number of keys with an entry, in any state.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether no key has been requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

/// Runs `work`, then replaces the pending entry of `key` by its outcome.
fn settle_after<K, V, Fut>(
    entries: Entries<K, V>,
    key: K,
    work: Fut,
) -> BoxFuture<'static, StickerKitResult<V>>
where
    K: Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    Fut: Future<Output = StickerKitResult<V>> + Send + 'static,
{
    async move {
        let outcome = work.await;
        settle(&entries, &key, &outcome);
        outcome
    }
    .boxed()
}

/// Replaces a pending entry by its outcome. Settled entries are left alone.
fn settle<K, V>(entries: &Mutex<EntryMap<K, V>>, key: &K, outcome: &StickerKitResult<V>)
where
    K: Eq + Hash + fmt::Debug,
    V: Clone,
{
    let mut entries = lock(entries);
    let pending = entries
        .get_mut(key)
        .filter(|entry| matches!(entry, CacheEntry::Pending(_)));
    if let Some(entry) = pending {
        *entry = match outcome {
            Ok(value) => CacheEntry::Resolved(value.clone()),
            Err(error) => {
                log::debug!("caching failure for {key:?}: {error}");
                CacheEntry::Failed(error.clone())
            }
        };
    }
}

/// Spawns `work` on the current tokio runtime and returns a shared handle to its outcome.
///
/// Outside a runtime, `work` itself is shared and only progresses while awaited.
fn detach<V>(work: BoxFuture<'static, StickerKitResult<V>>) -> SharedComputation<V>
where
    V: Clone + Send + Sync + 'static,
{
    let Ok(runtime) = Handle::try_current() else {
        log::trace!("no tokio runtime, computation is driven by its callers");
        return work.shared();
    };

    let task = runtime.spawn(work);
    async move {
        task.await.unwrap_or_else(|err| {
            Err(StickerKitError::Interrupted {
                reason: err.to_string(),
            })
        })
    }
    .boxed()
    .shared()
}

// A panic while holding the lock cannot leave the map half-updated: every mutation is a single
// insert or assignment.
fn lock<K, V: Clone>(entries: &Mutex<EntryMap<K, V>>) -> MutexGuard<'_, EntryMap<K, V>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, V> Default for ResponseCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: Clone> fmt::Debug for ResponseCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &lock(&self.entries).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::executor::block_on;
    use tokio::sync::Notify;

    use super::*;

    fn counting(
        calls: &Arc<AtomicUsize>,
        result: StickerKitResult<u32>,
    ) -> impl FnOnce() -> BoxFuture<'static, StickerKitResult<u32>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { result }.boxed()
        }
    }

    #[tokio::test]
    async fn test_computes_once_and_caches_value() {
        let cache = ResponseCache::<&str, u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get_or_compute("a", counting(&calls, Ok(7))).await, Ok(7));
        assert_eq!(cache.get_or_compute("a", counting(&calls, Ok(8))).await, Ok(7));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(&"a"), Some(EntryState::Resolved));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_cached() {
        let cache = ResponseCache::<&str, u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_compute("a", counting(&calls, Err(StickerKitError::Integrity)))
            .await;
        let second = cache.get_or_compute("a", counting(&calls, Ok(1))).await;

        assert_eq!(first, Err(StickerKitError::Integrity));
        assert_eq!(second, Err(StickerKitError::Integrity));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(&"a"), Some(EntryState::Failed));
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        let cache = ResponseCache::<&str, u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_compute("a", counting(&calls, Err(StickerKitError::Integrity)))
            .await
            .unwrap_err();
        let b = cache.get_or_compute("b", counting(&calls, Ok(2))).await;

        assert_eq!(b, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.state(&"c").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = ResponseCache::<&str, u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let gated = |calls: &Arc<AtomicUsize>, release: &Arc<Notify>| {
            let calls = Arc::clone(calls);
            let release = Arc::clone(release);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    release.notified().await;
                    Ok::<u32, StickerKitError>(5)
                }
            }
        };

        let first = cache.get_or_compute("a", gated(&calls, &release));
        let second = cache.get_or_compute("a", gated(&calls, &release));
        let opener = async {
            while cache.state(&"a") != Some(EntryState::Pending) {
                tokio::task::yield_now().await;
            }
            release.notify_one();
        };

        let (first, second, ()) = tokio::join!(first, second, opener);

        assert_eq!(first, Ok(5));
        assert_eq!(second, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(&"a"), Some(EntryState::Resolved));
    }

    #[tokio::test]
    async fn test_abandoned_computation_runs_to_completion() {
        let cache = ResponseCache::<&str, u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let progressed = Arc::new(AtomicUsize::new(0));

        let compute = {
            let calls = Arc::clone(&calls);
            let progressed = Arc::clone(&progressed);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::task::yield_now().await;
                    progressed.fetch_add(1, Ordering::SeqCst);
                    Ok::<u32, StickerKitError>(9)
                }
            }
        };

        // Poll once, then drop the only caller's future.
        let abandoned = cache.get_or_compute("a", compute);
        assert!(futures::poll!(Box::pin(abandoned)).is_pending());

        tokio::time::timeout(Duration::from_secs(5), async {
            while cache.state(&"a") != Some(EntryState::Resolved) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("abandoned computation settles on its own");
        assert_eq!(progressed.load(Ordering::SeqCst), 1);

        let value = cache.get_or_compute("a", counting(&calls, Ok(0))).await;
        assert_eq!(value, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_without_runtime_callers_drive_the_computation() {
        let cache = ResponseCache::<&str, u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = block_on(cache.get_or_compute("a", counting(&calls, Ok(3))));
        let second = block_on(cache.get_or_compute("a", counting(&calls, Ok(4))));

        assert_eq!(first, Ok(3));
        assert_eq!(second, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(&"a"), Some(EntryState::Resolved));
    }
}
