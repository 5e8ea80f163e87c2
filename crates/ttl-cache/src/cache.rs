//! TTL cache with a background expiration sweeper.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::entry::{Entry, expire_after, unix_now};
use crate::error::{Error, Result};
use crate::sweeper::SweeperHandle;

/// Store shared between the cache handle and the sweeper task.
struct Store<T> {
    entries: RwLock<HashMap<i64, Entry<T>>>,

    /// Number of sweep passes run.
    sweeps: AtomicU64,

    /// Total entries removed by sweep passes.
    swept: AtomicU64,
}

impl<T> Store<T> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sweeps: AtomicU64::new(0),
            swept: AtomicU64::new(0),
        }
    }

    /// Remove every entry expired as of now, returning how many were removed.
    fn sweep(&self) -> usize {
        let now = unix_now();
        let mut entries = self.entries.write();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.swept.fetch_add(removed as u64, Ordering::Relaxed);

        if removed > 0 {
            debug!(
                removed = removed,
                remaining = entries.len(),
                "Swept expired entries"
            );
        }

        removed
    }
}

/// In-process cache whose entries expire at absolute Unix timestamps.
///
/// Each cache owns one background sweeper, started at construction, that
/// removes expired entries every cleanup interval. Reads do not check
/// expiration: an expired entry stays readable until the next sweep.
///
/// All operations take `&self`; share the cache between tasks with an
/// [`Arc`]. Call [`TtlCache::shutdown`] to stop the sweeper and wait for it.
/// Dropping the cache signals the sweeper to stop without waiting.
pub struct TtlCache<T> {
    store: Arc<Store<T>>,
    sweeper: SweeperHandle,
    config: CacheConfig,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache that sweeps every `cleanup_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cleanup_interval: Duration) -> Result<Self> {
        Self::with_config(CacheConfig::new().with_cleanup_interval(cleanup_interval))
    }

    /// Create a cache from a configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(Store::new());
        let sweep_store = Arc::clone(&store);
        let sweeper = SweeperHandle::spawn(config.cleanup_interval, move || {
            sweep_store.sweep();
        })?;

        Ok(Self {
            store,
            sweeper,
            config,
        })
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert or replace the entry for `key`.
    ///
    /// `expire_at` is not validated; an entry that is already expired is
    /// stored and removed by the next sweep.
    pub fn add(&self, value: T, key: i64, expire_at: i64) {
        let mut entries = self.store.entries.write();
        entries.insert(key, Entry::new(value, expire_at));
        trace!(key = key, expire_at = expire_at, size = entries.len(), "Entry added");
    }

    /// Insert or replace the entry for `key`, expiring `ttl` from now.
    pub fn add_with_ttl(&self, value: T, key: i64, ttl: Duration) {
        self.add(value, key, expire_after(ttl));
    }

    /// Get the value stored under `key`.
    ///
    /// Returns [`Error::NotFound`] on a cache miss. Expired entries that
    /// have not been swept yet are still returned.
    pub fn read_by_id(&self, key: i64) -> Result<T> {
        let entries = self.store.entries.read();
        match entries.get(&key) {
            Some(entry) => {
                trace!(key = key, "Cache hit");
                Ok(entry.value.clone())
            }
            None => {
                trace!(key = key, "Cache miss");
                Err(Error::NotFound(key))
            }
        }
    }

    /// Get every stored value, in no particular order.
    pub fn read_all(&self) -> Vec<T> {
        self.store
            .entries
            .read()
            .values()
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Remove the entry for `key`. Does nothing if the key is absent.
    pub fn delete_by_id(&self, key: i64) {
        if self.store.entries.write().remove(&key).is_some() {
            trace!(key = key, "Entry deleted");
        }
    }

    /// Check if an entry is stored under `key`.
    pub fn contains(&self, key: i64) -> bool {
        self.store.entries.read().contains_key(&key)
    }

    /// Get the number of stored entries, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.store.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.store.entries.read().is_empty()
    }

    /// Run a sweep pass now, returning the number of entries removed.
    ///
    /// This is the same pass the background sweeper runs each interval.
    pub fn cleanup_expired(&self) -> usize {
        self.store.sweep()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            sweeps: self.store.sweeps.load(Ordering::Relaxed),
            swept: self.store.swept.load(Ordering::Relaxed),
        }
    }

    /// Check if the background sweeper is still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stop the background sweeper and wait for it to exit.
    ///
    /// Stored entries remain readable afterwards but are no longer swept.
    pub async fn shutdown(&self) {
        self.sweeper.join().await;
        debug!(size = self.len(), "Cache shut down");
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of stored entries.
    pub size: usize,

    /// Number of sweep passes run so far.
    pub sweeps: u64,

    /// Total entries removed by sweep passes.
    pub swept: u64,
}
