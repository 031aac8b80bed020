//! Memoizing cache with a time-to-live.
//!
//! Each key maps to a slot holding `(value, expires_at)`. A lookup returns the
//! stored value while `now < expires_at`; otherwise it runs the loader and
//! stores the result. Failed loads are not stored.
//!
//! # At-most-once
//! The outer map lock is held only long enough to find or create the key's
//! slot. The loader then runs under the slot's own lock, so concurrent callers
//! for the same key wait for the first one and reuse its value, while
//! different keys load in parallel.
//!
//! # Eviction
//! Expired entries are replaced on access and dropped by [`TtlCache::purge_expired_at`].
//! When a new key would exceed `capacity`, expired entries are purged first
//! and then the entry closest to expiry is evicted.
//!
//! # Clock injection
//! Every time-dependent method has an `_at(now)` form, mirroring the plain
//! one that uses `Instant::now()`, so tests never sleep.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

type Slot<V> = Arc<Mutex<Option<(V, Instant)>>>;

pub struct TtlCache<K, V> {
    ttl: Duration,
    capacity: usize,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking loader leaves the slot empty, which is a valid state.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// `capacity` is clamped to at least one entry.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live value for `key`, if any.
    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let slot = lock(&self.slots).get(key).cloned()?;
        let guard = lock(&slot);
        match guard.as_ref() {
            Some((value, expires_at)) if now < *expires_at => Some(value.clone()),
            _ => None,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Returns the cached value or computes, stores and returns a new one.
    ///
    /// The boolean is `true` when the value came from the cache.
    pub fn get_or_try_insert_with_at<E, F>(&self, key: K, now: Instant, load: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot_for(key, now);
        let mut guard = lock(&slot);
        if let Some((value, expires_at)) = guard.as_ref() {
            if now < *expires_at {
                return Ok((value.clone(), true));
            }
        }
        let value = load()?;
        *guard = Some((value.clone(), now + self.ttl));
        Ok((value, false))
    }

    pub fn get_or_try_insert_with<E, F>(&self, key: K, load: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_or_try_insert_with_at(key, Instant::now(), load)
    }

    /// Infallible variant of [`Self::get_or_try_insert_with_at`].
    pub fn get_or_insert_with_at<F>(&self, key: K, now: Instant, load: F) -> (V, bool)
    where
        F: FnOnce() -> V,
    {
        match self.get_or_try_insert_with_at::<std::convert::Infallible, _>(key, now, || Ok(load())) {
            Ok(hit) => hit,
            Err(never) => match never {},
        }
    }

    pub fn get_or_insert_with<F>(&self, key: K, load: F) -> (V, bool)
    where
        F: FnOnce() -> V,
    {
        self.get_or_insert_with_at(key, Instant::now(), load)
    }

    /// Drops the entry for `key`.
    pub fn invalidate(&self, key: &K) {
        lock(&self.slots).remove(key);
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut slots = lock(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| Self::is_live(slot, now));
        before - slots.len()
    }

    /// Number of keys with a slot, live or not.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(slot: &Slot<V>, now: Instant) -> bool {
        // A slot currently being filled by another caller counts as live.
        match slot.try_lock() {
            Ok(guard) => matches!(guard.as_ref(), Some((_, exp)) if now < *exp),
            Err(std::sync::TryLockError::WouldBlock) => true,
            Err(std::sync::TryLockError::Poisoned(p)) => {
                matches!(p.into_inner().as_ref(), Some((_, exp)) if now < *exp)
            }
        }
    }

    fn expiry_of(slot: &Slot<V>) -> Option<Instant> {
        slot.try_lock().ok().and_then(|g| g.as_ref().map(|(_, exp)| *exp))
    }

    fn slot_for(&self, key: K, now: Instant) -> Slot<V> {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get(&key) {
            return Arc::clone(slot);
        }
        if slots.len() >= self.capacity {
            slots.retain(|_, slot| Self::is_live(slot, now));
        }
        if slots.len() >= self.capacity {
            let victim = slots
                .iter()
                .filter_map(|(k, slot)| Self::expiry_of(slot).map(|exp| (k.clone(), exp)))
                .min_by_key(|(_, exp)| *exp)
                .map(|(k, _)| k);
            if let Some(victim) = victim {
                slots.remove(&victim);
            }
        }
        let slot: Slot<V> = Arc::new(Mutex::new(None));
        slots.insert(key, Arc::clone(&slot));
        slot
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(7200);

    #[test]
    fn test_second_lookup_within_ttl_is_a_hit() {
        let cache: TtlCache<&str, u32> = TtlCache::new(TTL, 8);
        let t0 = Instant::now();
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        };

        assert_eq!(cache.get_or_insert_with_at("k", t0, load), (42, false));
        assert_eq!(
            cache.get_or_insert_with_at("k", t0 + Duration::from_secs(60), load),
            (42, true)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_entry_expires_exactly_at_ttl() {
        let cache: TtlCache<&str, u32> = TtlCache::new(TTL, 8);
        let t0 = Instant::now();
        cache.get_or_insert_with_at("k", t0, || 1);

        assert_eq!(cache.get_at(&"k", t0 + TTL - Duration::from_secs(1)), Some(1));
        assert_eq!(cache.get_at(&"k", t0 + TTL), None, "age == ttl is expired");

        let (value, hit) = cache.get_or_insert_with_at("k", t0 + TTL, || 2);
        assert_eq!((value, hit), (2, false), "expired entry is reloaded");
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new(TTL, 8);
        let t0 = Instant::now();
        let first: Result<(u32, bool), &str> = cache.get_or_try_insert_with_at("k", t0, || Err("boom"));
        assert_eq!(first, Err("boom"));
        let second: Result<(u32, bool), &str> = cache.get_or_try_insert_with_at("k", t0, || Ok(7));
        assert_eq!(second, Ok((7, false)));
    }

    #[test]
    fn test_capacity_evicts_entry_closest_to_expiry() {
        let cache: TtlCache<u32, u32> = TtlCache::new(TTL, 2);
        let t0 = Instant::now();
        cache.get_or_insert_with_at(1, t0, || 10);
        cache.get_or_insert_with_at(2, t0 + Duration::from_secs(10), || 20);
        cache.get_or_insert_with_at(3, t0 + Duration::from_secs(20), || 30);

        assert_eq!(cache.len(), 2);
        let now = t0 + Duration::from_secs(30);
        assert_eq!(cache.get_at(&1, now), None);
        assert_eq!(cache.get_at(&2, now), Some(20));
        assert_eq!(cache.get_at(&3, now), Some(30));
    }

    #[test]
    fn test_purge_expired_removes_only_stale_entries() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(100), 8);
        let t0 = Instant::now();
        cache.get_or_insert_with_at(1, t0, || 1);
        cache.get_or_insert_with_at(2, t0 + Duration::from_secs(50), || 2);

        assert_eq!(cache.purge_expired_at(t0 + Duration::from_secs(120)), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at(&2, t0 + Duration::from_secs(120)), Some(2));
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let cache: TtlCache<&str, u32> = TtlCache::new(TTL, 8);
        let t0 = Instant::now();
        cache.get_or_insert_with_at("k", t0, || 1);
        cache.invalidate(&"k");
        assert_eq!(cache.get_or_insert_with_at("k", t0, || 2), (2, false));
    }

    #[test]
    fn test_concurrent_callers_load_once() {
        let cache: Arc<TtlCache<&str, u32>> = Arc::new(TtlCache::new(TTL, 8));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache
                        .get_or_insert_with("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            99
                        })
                        .0
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
