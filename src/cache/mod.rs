//! Single-entry TTL cache for the availability snapshot.
//!
//! The entry is either absent or present with an expiry. Every invalidation
//! bumps a generation counter; a rebuild captures the generation before it
//! reads the store and its result is only stored if no invalidation happened
//! meanwhile. Concurrent rebuilds are not coalesced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

struct Entry<T> {
    value: Arc<T>,
    expires_at: Instant,
}

pub struct TtlCache<T> {
    ttl: Duration,
    entry: RwLock<Option<Entry<T>>>,
    generation: AtomicU64,
}

impl<T: Send + Sync + 'static> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Current generation, to be passed back to [`TtlCache::set`]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn get(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().await;
        match entry.as_ref() {
            Some(e) if e.expires_at > Instant::now() => Some(e.value.clone()),
            _ => None,
        }
    }

    /// Stores `value` with a fresh TTL unless the cache was invalidated after
    /// `generation` was read. Returns whether the value was stored.
    pub async fn set(&self, value: Arc<T>, generation: u64) -> bool {
        let mut entry = self.entry.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *entry = Some(Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        });
        true
    }

    pub async fn invalidate(&self) {
        let mut entry = self.entry.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *entry = None;
    }

    /// Drops the entry if it expired; returns whether something was evicted
    pub async fn purge_expired(&self) -> bool {
        let mut entry = self.entry.write().await;
        match entry.as_ref() {
            Some(e) if e.expires_at <= Instant::now() => {
                *entry = None;
                true
            }
            _ => false,
        }
    }

    /// Periodically evicts an expired entry so it isn't held in memory
    pub fn spawn_janitor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else { break };
                if cache.purge_expired().await {
                    tracing::trace!("evicted expired cache entry");
                }
            }
        })
    }
}
