//! TTL response cache shielding the upstream wait-times API
//!
//! Generic in-memory key-value store with per-entry absolute expiration.
//! Expiry is enforced lazily on every read; a fixed-period background sweep
//! additionally removes entries that were written once and never read again,
//! to bound peak memory. Entries are never renewed by reads (no sliding
//! expiration).
//!
//! A cache instance is constructed by the composition root, shared behind an
//! [`Arc`], and released with [`TtlCache::destroy`] when the process shuts
//! down. The cache itself never registers signal handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Default period of the background sweep, independent of the entry TTL.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One stored value together with its expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Payload supplied by the caller.
    pub data: T,
    /// Wall-clock insertion time, served back to clients as `_cachedAt`.
    pub stored_at: DateTime<Utc>,
    /// Monotonic deadline. Fixed at insertion; reads never extend it.
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Point-in-time cache introspection data.
///
/// Taken without expiry checks, so `keys` may still list entries that are
/// logically expired but not yet swept. Callers needing guaranteed-live
/// counts must [`TtlCache::get`] per key.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Current number of entries, swept or not.
    pub size: usize,
    /// Snapshot of the entry keys at call time.
    pub keys: Vec<String>,
}

/// In-memory key-value store with a fixed TTL shared by all entries.
///
/// All operations are synchronous and total: `get`/`set`/`stats`/`clear`
/// never fail and never block. The entry map is a [`DashMap`], so one
/// instance can be shared across preemptive request handlers without
/// external locking. Independent instances (one per logical dataset) share
/// nothing.
///
/// A TTL of zero is accepted: every entry is then immediately stale and
/// `get` never returns it.
pub struct TtlCache<T> {
    entries: Arc<DashMap<String, CacheEntry<T>>>,
    ttl: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries expire `ttl` after insertion, swept at
    /// [`DEFAULT_SWEEP_INTERVAL`].
    ///
    /// Must be called from within a Tokio runtime: construction spawns the
    /// background sweep task.
    pub fn new(ttl: Duration) -> Self {
        Self::with_sweep_interval(ttl, DEFAULT_SWEEP_INTERVAL)
    }

    /// Create a cache with an explicit sweep period.
    ///
    /// The sweep period is maintenance-only and independent of `ttl`;
    /// expiration correctness is carried by the lazy check in [`Self::get`].
    pub fn with_sweep_interval(ttl: Duration, sweep_interval: Duration) -> Self {
        let entries: Arc<DashMap<String, CacheEntry<T>>> = Arc::new(DashMap::new());

        let sweep_entries = Arc::clone(&entries);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the initial
            // sweep happens one full period after construction.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                sweep(&sweep_entries);
            }
        });

        Self {
            entries,
            ttl,
            sweeper: Mutex::new(Some(handle)),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Look up `key`, removing it if expired.
    ///
    /// Returns the entry with its original `stored_at`/`expires_at` while
    /// live, `None` once `now >= expires_at` (the read itself deletes the
    /// stale entry) and always `None` after [`Self::destroy`].
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        if self.destroyed.load(Ordering::Relaxed) {
            return None;
        }
        let entry = self.entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            drop(entry);
            self.entries.remove(key);
            debug!(key, "removed expired cache entry on read");
            return None;
        }
        Some(entry.value().clone())
    }

    /// Insert or unconditionally overwrite the entry for `key`.
    ///
    /// The new entry's deadline is computed from the current instant; an
    /// overwrite therefore gets a fresh expiry. Silently dropped after
    /// [`Self::destroy`].
    pub fn set(&self, key: &str, data: T) {
        if self.destroyed.load(Ordering::Relaxed) {
            return;
        }
        let entry = CacheEntry {
            data,
            stored_at: Utc::now(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key.to_string(), entry);
        debug!(key, ttl = ?self.ttl, "cached entry");
    }

    /// Snapshot the current entry count and keys without touching expiry.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            keys: self.entries.iter().map(|e| e.key().clone()).collect(),
        }
    }

    /// The TTL shared by all entries of this instance.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remove all entries immediately. The sweep schedule is unaffected.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("cache cleared");
    }

    /// Cancel the background sweep and drop all entries.
    ///
    /// Idempotent and non-blocking, so it is safe to call from a shutdown
    /// path. After `destroy` the instance answers `get` with `None` and
    /// ignores `set`.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        self.entries.clear();
        debug!("cache destroyed");
    }
}

impl<T> Drop for TtlCache<T> {
    fn drop(&mut self) {
        // The sweep task holds a clone of the entry map; abort it so a
        // dropped-but-not-destroyed cache does not leak the task.
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

/// Delete every entry whose deadline has passed. Runs synchronously within
/// one sweep tick; ticks never overlap.
fn sweep<T>(entries: &DashMap<String, CacheEntry<T>>) {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    let removed = before.saturating_sub(entries.len());
    if removed > 0 {
        debug!(removed, "sweep removed expired cache entries");
    }
}
