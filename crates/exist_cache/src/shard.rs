// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache shard implementation.
//!
//! A shard owns a present generation of confirmed keys, an optional stale generation
//! when eviction is enabled, and a registry of loads currently in flight. All three sit
//! behind one mutex. The loader itself always runs with the mutex released, so slow
//! lookups for one key never hold up other keys on the same shard.

use std::mem;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;

use crate::flight::Flight;
use crate::{Context, ShardConfig};

/// Cache line size for alignment to prevent false sharing.
const CACHE_LINE_SIZE: usize = 64;

/// Upper bound on the storage reserved up front for a generation.
///
/// The capacity hint is caller supplied and may be arbitrarily large; sets beyond this
/// grow on demand instead.
const MAX_PRESIZE: usize = 1 << 12;

type KeySet = HashSet<i64, FxBuildHasher>;

fn key_set(capacity: usize) -> KeySet {
    HashSet::with_capacity_and_hasher(capacity.min(MAX_PRESIZE), FxBuildHasher)
}

/// Point-in-time counts for one shard, read under the shard lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardStats {
    /// Keys in the current generation.
    pub present: usize,
    /// Keys in the previous generation. Always zero without eviction.
    pub stale: usize,
    /// Distinct keys with a load in progress.
    pub in_flight: usize,
}

impl ShardStats {
    /// Resident keys, present and stale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.present + self.stale
    }

    /// Returns `true` if the shard holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single independently locked partition of the key space.
///
/// Aligned to the CPU cache line (64 bytes) to prevent cache-line bouncing between locks.
#[repr(align(64))]
pub(crate) struct Shard {
    inner: Mutex<ShardInner>,
    config: Arc<ShardConfig>,
    /// Explicit padding to ensure the lock of the next shard resides on a different cache line.
    _pad: [u8; CACHE_LINE_SIZE],
}

impl Shard {
    pub fn new(config: Arc<ShardConfig>) -> Self {
        Self {
            inner: Mutex::new(ShardInner::new(config.capacity, config.eviction)),
            config,
            _pad: [0; CACHE_LINE_SIZE],
        }
    }

    /// Reports whether `key` exists, consulting the loader on a miss.
    ///
    /// Concurrent misses for the same key share one loader call. The first caller runs
    /// it with its own `ctx`; the others block until the outcome is published.
    pub fn has(&self, ctx: &Context, key: i64) -> bool {
        let Some(loader) = self.config.loader.as_deref() else {
            return self.inner.lock().lookup(key, self.config.capacity);
        };

        let flight = {
            let mut inner = self.inner.lock();
            if inner.lookup(key, self.config.capacity) {
                return true;
            }

            if let Some(flight) = inner.in_flight.get(&key).map(Arc::clone) {
                drop(inner);
                tracing::trace!(key, "joined in-flight load");
                return flight.wait();
            }

            let flight = Arc::new(Flight::new());
            inner.in_flight.insert(key, Arc::clone(&flight));
            flight
        };

        tracing::trace!(key, "load started");
        let guard = LoadGuard {
            shard: self,
            key,
            flight,
            settled: false,
        };
        let exists = loader.load(ctx, key);
        guard.settle(exists)
    }

    /// Marks `key` as existing without consulting the loader.
    pub fn set(&self, key: i64) {
        self.inner.lock().insert(key, self.config.capacity);
    }

    pub fn stats(&self) -> ShardStats {
        let inner = self.inner.lock();
        ShardStats {
            present: inner.present.len(),
            stale: inner.stale.as_ref().map_or(0, HashSet::len),
            in_flight: inner.in_flight.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.stats().len()
    }

    /// Records the load outcome and releases every waiter.
    ///
    /// The key is inserted and the registration removed in one critical section, so a
    /// caller that misses the registration is guaranteed to see a confirmed key.
    fn finish_load(&self, key: i64, flight: &Arc<Flight>, exists: bool) {
        {
            let mut inner = self.inner.lock();
            if exists {
                inner.insert(key, self.config.capacity);
            }
            if inner.in_flight.get(&key).is_some_and(|current| Arc::ptr_eq(current, flight)) {
                inner.in_flight.remove(&key);
            }
        }
        flight.complete(exists);
        tracing::trace!(key, exists, "load completed");
    }

    #[cfg(test)]
    pub fn present_keys(&self) -> Vec<i64> {
        let mut keys: Vec<_> = self.inner.lock().present.iter().copied().collect();
        keys.sort_unstable();
        keys
    }

    #[cfg(test)]
    pub fn stale_keys(&self) -> Vec<i64> {
        let mut keys: Vec<_> = self.inner.lock().stale.iter().flatten().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Shard")
            .field("present", &stats.present)
            .field("stale", &stats.stale)
            .field("in_flight", &stats.in_flight)
            .finish()
    }
}

/// Inner state of a shard.
struct ShardInner {
    /// The generation currently being filled.
    present: KeySet,
    /// The previous generation, `Some` only with eviction enabled.
    stale: Option<KeySet>,
    /// Keys whose load is running, with the slot their waiters block on.
    in_flight: HashMap<i64, Arc<Flight>, FxBuildHasher>,
}

impl ShardInner {
    fn new(capacity: usize, eviction: bool) -> Self {
        Self {
            present: key_set(capacity),
            stale: eviction.then(KeySet::default),
            in_flight: HashMap::default(),
        }
    }

    /// Returns `true` if `key` is resident, promoting it out of the stale generation.
    fn lookup(&mut self, key: i64, capacity: usize) -> bool {
        if self.present.contains(&key) {
            return true;
        }
        if self.stale.as_mut().is_some_and(|stale| stale.remove(&key)) {
            self.insert(key, capacity);
            return true;
        }
        false
    }

    /// Adds `key` to the present generation, rotating generations first when it is full.
    fn insert(&mut self, key: i64, capacity: usize) {
        if self.present.contains(&key) {
            return;
        }

        if let Some(stale) = self.stale.as_mut() {
            stale.remove(&key);
            if self.present.len() >= capacity {
                let demoted = mem::replace(&mut self.present, key_set(capacity));
                let dropped = mem::replace(stale, demoted);
                tracing::debug!(demoted = stale.len(), dropped = dropped.len(), "shard generation rollover");
            }
        }

        self.present.insert(key);
    }
}

/// Settles an in-flight load even if the loader unwinds.
///
/// An abandoned load publishes `false` to its waiters and clears the registration, so
/// the next miss starts a fresh load.
struct LoadGuard<'a> {
    shard: &'a Shard,
    key: i64,
    flight: Arc<Flight>,
    settled: bool,
}

impl LoadGuard<'_> {
    fn settle(mut self, exists: bool) -> bool {
        self.shard.finish_load(self.key, &self.flight, exists);
        self.settled = true;
        exists
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(key = self.key, "load abandoned before completion");
            self.shard.finish_load(self.key, &self.flight, false);
        }
    }
}
