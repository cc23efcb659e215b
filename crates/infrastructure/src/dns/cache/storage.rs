use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use generational_arena::{Arena, Index};
use hickory_proto::op::Message;
use rustc_hash::FxBuildHasher;
use tracing::{debug, info};
use weftdns_domain::{CacheConfig, CacheError};

use super::entry::{CacheEntry, EntryFlags};
use super::expiration::ExpirationIndex;
use super::key::CacheKey;
use super::metrics::CacheMetrics;

/// How long a pending placeholder stays valid: the window a resolution gets
/// to finish before a later lookup may discard the placeholder and retry.
pub(crate) const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(5);

/// The map, the entry arena and the expiration index form one unit; they are
/// only ever mutated together, behind the cache-wide lock.
struct CacheInner {
    entries: Arena<CacheEntry>,
    by_key: HashMap<CacheKey, Index, FxBuildHasher>,
    expirations: ExpirationIndex,
}

/// Thread-safe response cache with a fixed capacity.
///
/// A single exclusive lock guards all internal state: a hit can expire the
/// entry it touched and a miss installs a placeholder, so every operation
/// mutates and there is no read-only path worth a shared lock.
pub struct ResponseCache {
    capacity: usize,
    pending_ttl: Duration,
    metrics: Arc<CacheMetrics>,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` resolved entries.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        Self::with_pending_ttl(capacity, DEFAULT_PENDING_TTL)
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::with_pending_ttl(
            config.capacity,
            Duration::from_secs(config.pending_ttl_secs),
        )
    }

    pub fn with_pending_ttl(capacity: usize, pending_ttl: Duration) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }

        info!(capacity, "response cache initialized");

        Ok(Self {
            capacity,
            pending_ttl,
            metrics: Arc::new(CacheMetrics::default()),
            inner: Mutex::new(CacheInner {
                entries: Arena::with_capacity(capacity),
                by_key: HashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
                expirations: ExpirationIndex::new(),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries in the map, pending placeholders included.
    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Store a resolution result for the request's question.
    ///
    /// A nonzero `ttl` overrides the validity window derived from the reply's
    /// answer records. `reply` may be `None` for results that carry only
    /// flags, such as the negative-cache marker. Returns the stored reply's
    /// serialized length.
    pub fn put(
        &self,
        request: &Message,
        reply: Option<&Message>,
        ttl: u32,
        flags: EntryFlags,
        now: Instant,
    ) -> usize {
        let Some(question) = request.queries().first() else {
            debug!(id = request.id(), "put request carries no question; ignored");
            return 0;
        };
        let key = CacheKey::from_query(question);

        let mut guard = self.lock();
        let CacheInner {
            entries,
            by_key,
            expirations,
        } = &mut *guard;

        if let Some(&handle) = by_key.get(&key) {
            let changed = entries[handle].set_reply(reply, ttl, flags, now);
            if entries[handle].heap_pos().is_some() {
                if changed {
                    expirations.fix(entries, handle);
                }
            } else {
                // a placeholder just resolved: it now has a real validity
                // window and must take part in expiration order and capacity
                self.evict_for_capacity(entries, by_key, expirations);
                expirations.push(entries, handle);
            }
            entries[handle].reply_len()
        } else {
            self.evict_for_capacity(entries, by_key, expirations);

            let mut entry = CacheEntry::pending(key.clone(), now, self.pending_ttl);
            entry.set_reply(reply, ttl, flags, now);
            let reply_len = entry.reply_len();

            let handle = entries.insert(entry);
            expirations.push(entries, handle);
            by_key.insert(key, handle);

            self.metrics.insertions.fetch_add(1, Ordering::Relaxed);
            debug!(
                id = request.id(),
                reply_len,
                cache_size = by_key.len(),
                "stored response in cache"
            );
            reply_len
        }
    }

    /// Look up a reply for the request's question.
    ///
    /// `Ok(None)` means miss, pending, or expired; the caller decides whether
    /// to start a resolution and `put` the outcome. On the first miss for a
    /// key a pending placeholder is installed, so concurrent callers racing
    /// the same name wait for one resolution instead of launching their own.
    pub fn get(
        &self,
        request: &Message,
        max_len: usize,
        now: Instant,
    ) -> Result<Option<Message>, CacheError> {
        let Some(question) = request.queries().first() else {
            debug!(id = request.id(), "request carries no question");
            return Ok(None);
        };
        let key = CacheKey::from_query(question);

        let mut guard = self.lock();
        let CacheInner {
            entries,
            by_key,
            expirations,
        } = &mut *guard;

        let Some(&handle) = by_key.get(&key) else {
            debug!(id = request.id(), "adding in pending state");
            let handle = entries.insert(CacheEntry::pending(key.clone(), now, self.pending_ttl));
            by_key.insert(key, handle);
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let result = entries[handle].served_reply(request, max_len, now);

        // expiry dominates whatever was computed above, the negative-cache
        // marker included
        if entries[handle].has_expired(now) {
            debug!(id = request.id(), "expired: removing");
            expirations.remove(entries, handle);
            entries.remove(handle);
            by_key.remove(&key);
            self.metrics.expirations.fetch_add(1, Ordering::Relaxed);
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        match &result {
            Ok(Some(_)) | Err(_) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            }
        }

        result
    }

    /// Remove the entry for `key`, if any. Absent keys are not an error.
    pub fn remove(&self, key: &CacheKey) {
        let mut guard = self.lock();
        let CacheInner {
            entries,
            by_key,
            expirations,
        } = &mut *guard;

        if let Some(handle) = by_key.remove(key) {
            expirations.remove(entries, handle);
            entries.remove(handle);
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge(&self, now: Instant) -> usize {
        let mut guard = self.lock();
        let CacheInner {
            entries,
            by_key,
            expirations,
        } = &mut *guard;

        let mut removed = 0usize;
        while let Some(root) = expirations.peek() {
            if !entries[root].has_expired(now) {
                // heap order: every remaining entry is still valid
                break;
            }
            expirations.pop_min(entries);
            if let Some(entry) = entries.remove(root) {
                by_key.remove(entry.key());
            }
            removed += 1;
        }

        // placeholders never join the index, so age them out here; this keeps
        // the map bounded under a stream of never-resolving keys
        by_key.retain(|_, handle| {
            let stale = entries
                .get(*handle)
                .map(|entry| entry.heap_pos().is_none() && entry.has_expired(now))
                .unwrap_or(true);
            if stale {
                entries.remove(*handle);
                removed += 1;
            }
            !stale
        });

        if removed > 0 {
            self.metrics
                .expirations
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, cache_size = by_key.len(), "purged expired entries");
        }
        removed
    }

    /// Drop everything; capacity is unchanged.
    pub fn clear(&self) {
        let mut guard = self.lock();
        guard.entries.clear();
        guard.by_key.clear();
        guard.expirations.clear();
        info!("cache cleared");
    }

    fn evict_for_capacity(
        &self,
        entries: &mut Arena<CacheEntry>,
        by_key: &mut HashMap<CacheKey, Index, FxBuildHasher>,
        expirations: &mut ExpirationIndex,
    ) {
        while expirations.len() >= self.capacity {
            let Some(handle) = expirations.pop_min(entries) else {
                break;
            };
            if let Some(entry) = entries.remove(handle) {
                debug!(name = %entry.key().name, "evicting earliest-expiring entry");
                by_key.remove(entry.key());
                self.metrics.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
