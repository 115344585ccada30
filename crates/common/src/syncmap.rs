//! Concurrent keyed store shared between the relay controller and the
//! data plane.
//!
//! [`SyncMap`] is a thin capability wrapper over a sharded concurrent map.
//! The method set is deliberately small — `load`, `store`, `delete`,
//! `load_or_store`, `range` — because everything the controller guarantees
//! about relay bookkeeping is expressed through these five operations.
//!
//! `range` sees a consistent snapshot per key but not a global snapshot:
//! entries inserted or removed while iterating may or may not be observed.
//! `load_or_store` is atomic per key, which is what makes the controller's
//! "exactly one in-flight connect per IP" invariant hold under concurrent
//! callers.

use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Thread-safe keyed store with per-key atomic insert-if-absent.
#[derive(Debug)]
pub struct SyncMap<K: Eq + Hash, V> {
    inner: DashMap<K, V>,
}

impl<K: Eq + Hash, V> Default for SyncMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> SyncMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> SyncMap<K, V> {
    /// Returns a clone of the value stored under `key`, if any.
    pub fn load(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    /// Inserts or overwrites the value under `key`.
    pub fn store(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Removes the entry under `key`, if any.
    pub fn delete(&self, key: &K) {
        self.inner.remove(key);
    }

    /// Returns the existing value and `true` when `key` was already present,
    /// otherwise stores `value` and returns it with `false`. Atomic per key.
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool) {
        match self.inner.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
                (value, false)
            }
        }
    }

    /// Calls `f` for every entry until it returns `false`.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for entry in self.inner.iter() {
            if !f(entry.key(), entry.value()) {
                break;
            }
        }
    }
}
