//! Bounded LRU cache of preference records.
//!
//! The cache fronts the preference store for low-latency reads (the game
//! front-end looks records up on every tick). The store stays authoritative,
//! so eviction never loses data.
//!
//! Invalidation is push-based: every successful write invalidates the
//! identity's entry. A miss hands out a [`CacheTicket`] carrying the current
//! epoch, and [`PreferenceCache::populate`] rejects a fill when that same
//! identity was invalidated after the ticket was issued. Without this, a
//! reader that fetched a record just before a write could re-insert the
//! pre-write value after the write's invalidation. Invalidating one identity
//! leaves fills for every other identity alone.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use pronouns_types::error::ConfigError;
use pronouns_types::identity::IdentityId;
use pronouns_types::record::PreferenceRecord;
use serde::Serialize;

/// Invalidations remembered before the log is pruned, for small caches.
const MIN_INVALIDATION_LOG: usize = 1024;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(PreferenceRecord),
    /// Not cached. Pass the ticket to `populate` after reading the store.
    Miss(CacheTicket),
}

/// Invalidation epoch observed at miss time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTicket {
    epoch: u64,
}

/// Counters for the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry {
    record: PreferenceRecord,
    tick: u64,
}

struct LruState {
    entries: HashMap<IdentityId, Entry>,
    /// Access tick -> identity, oldest first.
    order: BTreeMap<u64, IdentityId>,
    tick: u64,
    epoch: u64,
    /// Epoch of each identity's latest invalidation.
    invalidated: HashMap<IdentityId, u64>,
    /// Tickets older than this are rejected outright. Raised when
    /// `invalidated` is pruned.
    floor: u64,
}

impl LruState {
    fn is_stale(&self, identity: &IdentityId, ticket: CacheTicket) -> bool {
        ticket.epoch < self.floor
            || self
                .invalidated
                .get(identity)
                .is_some_and(|&epoch| epoch > ticket.epoch)
    }

    fn touch(&mut self, identity: &IdentityId) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(entry) = self.entries.get_mut(identity) {
            self.order.remove(&entry.tick);
            entry.tick = tick;
            self.order.insert(tick, *identity);
        }
    }

    fn remove(&mut self, identity: &IdentityId) -> bool {
        match self.entries.remove(identity) {
            Some(entry) => {
                self.order.remove(&entry.tick);
                true
            }
            None => false,
        }
    }
}

/// Thread-safe, bounded, least-recently-used record cache.
///
/// Every operation takes one short mutex-guarded critical section; nothing
/// awaits while holding the lock.
pub struct PreferenceCache {
    capacity: usize,
    state: Mutex<LruState>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PreferenceCache {
    /// Create a cache holding at most `capacity` records.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.capacity",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            capacity,
            state: Mutex::new(LruState {
                entries: HashMap::with_capacity(capacity.min(1024)),
                order: BTreeMap::new(),
                tick: 0,
                epoch: 0,
                invalidated: HashMap::new(),
                floor: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        // A panic mid-operation leaves the maps consistent enough to keep
        // serving; the store is authoritative anyway.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a record, marking it most recently used on a hit.
    pub fn get_cached(&self, identity: &IdentityId) -> CacheLookup {
        let mut state = self.lock();
        let record = state.entries.get(identity).map(|e| e.record.clone());
        match record {
            Some(record) => {
                state.touch(identity);
                self.hits.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Hit(record)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss(CacheTicket { epoch: state.epoch })
            }
        }
    }

    /// Insert a record read from the store after a miss.
    ///
    /// Returns `false` (and inserts nothing) when the record's identity was
    /// invalidated since the ticket was issued, or when a newer version is
    /// already cached.
    pub fn populate(&self, record: PreferenceRecord, ticket: CacheTicket) -> bool {
        let mut state = self.lock();
        let identity = record.identity_id;
        if state.is_stale(&identity, ticket) {
            return false;
        }

        if let Some(existing) = state.entries.get(&identity) {
            if existing.record.version > record.version {
                return false;
            }
        }

        state.remove(&identity);
        while state.entries.len() >= self.capacity {
            let Some((_, oldest)) = state.order.pop_first() else {
                break;
            };
            state.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }

        state.tick += 1;
        let tick = state.tick;
        state.order.insert(tick, identity);
        state.entries.insert(identity, Entry { record, tick });
        true
    }

    /// Drop an identity's entry and void its outstanding tickets.
    pub fn invalidate(&self, identity: &IdentityId) {
        let mut state = self.lock();
        state.epoch += 1;
        let epoch = state.epoch;
        state.remove(identity);

        // Tickets issued before this epoch can no longer be checked per
        // identity once the log is dropped, so they all become stale.
        if state.invalidated.len() >= self.capacity.max(MIN_INVALIDATION_LOG) {
            state.invalidated.clear();
            state.floor = epoch;
        }
        state.invalidated.insert(*identity, epoch);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use pronouns_types::record::FrontEnd;

    use super::*;

    fn record(identity: IdentityId, version: u64, pronouns: &[&str]) -> PreferenceRecord {
        PreferenceRecord {
            identity_id: identity,
            pronouns: pronouns.iter().map(|s| s.to_string()).collect(),
            version,
            updated_at: Utc::now(),
            updated_by: FrontEnd::Game,
        }
    }

    fn miss(cache: &PreferenceCache, identity: &IdentityId) -> CacheTicket {
        match cache.get_cached(identity) {
            CacheLookup::Miss(ticket) => ticket,
            CacheLookup::Hit(r) => panic!("expected miss, got {r:?}"),
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(PreferenceCache::new(0).is_err());
    }

    #[test]
    fn populate_then_hit() {
        let cache = PreferenceCache::new(4).unwrap();
        let id = IdentityId::new();

        let ticket = miss(&cache, &id);
        assert!(cache.populate(record(id, 1, &["she"]), ticket));

        match cache.get_cached(&id) {
            CacheLookup::Hit(r) => assert_eq!(r.pronouns, vec!["she"]),
            CacheLookup::Miss(_) => panic!("expected hit"),
        }
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn invalidation_voids_outstanding_ticket() {
        let cache = PreferenceCache::new(4).unwrap();
        let id = IdentityId::new();

        // Reader misses and goes to the store...
        let stale_ticket = miss(&cache, &id);
        // ...a write lands and invalidates...
        cache.invalidate(&id);
        // ...the reader's pre-write value must not be cached.
        assert!(!cache.populate(record(id, 1, &["he"]), stale_ticket));
        assert!(matches!(cache.get_cached(&id), CacheLookup::Miss(_)));
    }

    #[test]
    fn invalidation_of_other_identity_keeps_ticket() {
        let cache = PreferenceCache::new(4).unwrap();
        let a = IdentityId::new();
        let b = IdentityId::new();

        let ticket = miss(&cache, &a);
        cache.invalidate(&b);
        assert!(cache.populate(record(a, 1, &["they"]), ticket));
        assert!(matches!(cache.get_cached(&a), CacheLookup::Hit(_)));
    }

    #[test]
    fn steady_writes_elsewhere_do_not_starve_fills() {
        let cache = PreferenceCache::new(4).unwrap();
        let cold = IdentityId::new();

        let ticket = miss(&cache, &cold);
        for _ in 0..100 {
            cache.invalidate(&IdentityId::new());
        }
        assert!(cache.populate(record(cold, 1, &["xe"]), ticket));
    }

    #[test]
    fn ticket_issued_after_invalidation_is_accepted() {
        let cache = PreferenceCache::new(4).unwrap();
        let id = IdentityId::new();

        cache.invalidate(&id);
        let ticket = miss(&cache, &id);
        assert!(cache.populate(record(id, 2, &["he"]), ticket));
    }

    #[test]
    fn pruned_log_rejects_older_tickets() {
        let cache = PreferenceCache::new(4).unwrap();
        let id = IdentityId::new();

        let old_ticket = miss(&cache, &id);
        // Enough invalidations to prune the log, which may have held `id`.
        for _ in 0..=MIN_INVALIDATION_LOG {
            cache.invalidate(&IdentityId::new());
        }
        assert!(!cache.populate(record(id, 1, &["it"]), old_ticket));

        let fresh = miss(&cache, &id);
        assert!(cache.populate(record(id, 1, &["it"]), fresh));
    }

    #[test]
    fn older_version_does_not_replace_newer() {
        let cache = PreferenceCache::new(4).unwrap();
        let id = IdentityId::new();

        let ticket = miss(&cache, &id);
        assert!(cache.populate(record(id, 3, &["xe"]), ticket));
        assert!(!cache.populate(record(id, 2, &["it"]), ticket));
        match cache.get_cached(&id) {
            CacheLookup::Hit(r) => assert_eq!(r.version, 3),
            CacheLookup::Miss(_) => panic!("expected hit"),
        }
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PreferenceCache::new(2).unwrap();
        let a = IdentityId::new();
        let b = IdentityId::new();
        let c = IdentityId::new();

        let t = miss(&cache, &a);
        cache.populate(record(a, 1, &["a"]), t);
        let t = miss(&cache, &b);
        cache.populate(record(b, 1, &["b"]), t);

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(matches!(cache.get_cached(&a), CacheLookup::Hit(_)));

        let t = miss(&cache, &c);
        cache.populate(record(c, 1, &["c"]), t);

        assert_eq!(cache.len(), 2);
        assert!(matches!(cache.get_cached(&a), CacheLookup::Hit(_)));
        assert!(matches!(cache.get_cached(&b), CacheLookup::Miss(_)));
        assert!(matches!(cache.get_cached(&c), CacheLookup::Hit(_)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn repopulating_same_identity_does_not_evict() {
        let cache = PreferenceCache::new(1).unwrap();
        let id = IdentityId::new();

        let t = miss(&cache, &id);
        cache.populate(record(id, 1, &["she"]), t);
        cache.populate(record(id, 2, &["he"]), t);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn concurrent_access_stays_bounded() {
        let cache = Arc::new(PreferenceCache::new(64).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200u64 {
                        let id = IdentityId::new();
                        if let CacheLookup::Miss(t) = cache.get_cached(&id) {
                            cache.populate(record(id, i + 1, &["they"]), t);
                        }
                        if i % 17 == 0 {
                            cache.invalidate(&id);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 64);
    }
}
