use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Approximate size accounting for cached values.
///
/// The number does not need to be byte-exact, it only has to be consistent
/// between values so that the cost limit bounds memory in practice.
pub trait CacheCost {
    fn cost(&self) -> usize;
}

impl CacheCost for String {
    fn cost(&self) -> usize {
        self.len()
    }
}

impl CacheCost for Vec<u8> {
    fn cost(&self) -> usize {
        self.len()
    }
}

struct Entry<V> {
    value: V,
    cost: usize,
    last_access: AtomicU64,
}

struct Inner<K, V> {
    entries: DashMap<K, Entry<V>>,
    // Writers serialize on this lock so the cost invariant holds across
    // concurrent inserts; readers only touch `entries`.
    total_cost: Mutex<usize>,
    cost_limit: Option<usize>,
    clock: AtomicU64,
}

/// Thread-safe, cost-bounded cache with least-recently-used eviction.
///
/// Clones share the same storage.
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache bounded by `total_cost_limit`, or an unbounded one
    /// when `None`.
    pub fn new(total_cost_limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                total_cost: Mutex::new(0),
                cost_limit: total_cost_limit,
                clock: AtomicU64::new(0),
            }),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn with_cost_limit(total_cost_limit: usize) -> Self {
        Self::new(Some(total_cost_limit))
    }

    pub fn cost_limit(&self) -> Option<usize> {
        self.inner.cost_limit
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.get(key).map(|entry| {
            entry.last_access.store(self.tick(), Ordering::Relaxed);
            entry.value.clone()
        })
    }

    /// Stores `value` with an explicit cost, overriding the value's own
    /// estimate. Prefer [`Cache::set`] unless the estimate is known to be off.
    pub fn set_with_cost(&self, key: K, value: V, cost: usize) {
        let mut total = self.lock_total();

        if let Some((_, previous)) = self.inner.entries.remove(&key) {
            *total -= previous.cost;
        }

        if let Some(limit) = self.inner.cost_limit {
            if cost > limit {
                debug!(cost, limit, "Cache entry exceeds total cost limit, not stored");
                return;
            }
            while *total + cost > limit {
                let Some(victim) = self.least_recently_used() else {
                    break;
                };
                if let Some((_, evicted)) = self.inner.entries.remove(&victim) {
                    *total -= evicted.cost;
                    debug!(cost = evicted.cost, "Evicted cache entry");
                }
            }
        }

        self.inner.entries.insert(
            key,
            Entry {
                value,
                cost,
                last_access: AtomicU64::new(self.tick()),
            },
        );
        *total += cost;
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut total = self.lock_total();
        self.inner.entries.remove(key).map(|(_, entry)| {
            *total -= entry.cost;
            entry.value
        })
    }

    pub fn remove_all(&self) {
        let mut total = self.lock_total();
        self.inner.entries.clear();
        *total = 0;
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Sum of the costs of resident entries.
    pub fn total_cost(&self) -> usize {
        *self.lock_total()
    }

    fn least_recently_used(&self) -> Option<K> {
        self.inner
            .entries
            .iter()
            .min_by_key(|entry| entry.last_access.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone())
    }

    fn tick(&self) -> u64 {
        self.inner.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn lock_total(&self) -> MutexGuard<'_, usize> {
        self.inner
            .total_cost
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + CacheCost,
{
    /// Stores `value` using its estimated cost.
    pub fn set(&self, key: K, value: V) {
        let cost = value.cost();
        self.set_with_cost(key, value, cost);
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::unbounded()
    }
}
