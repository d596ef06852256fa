// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache facade.
//!
//! This module provides the main [`ExistCache`] type.

use std::sync::Arc;

use crate::shard::{Shard, ShardStats};
use crate::{Context, ExistCacheBuilder, ShardConfig};

/// A sharded cache of identifiers confirmed to exist.
///
/// Each key is routed to exactly one shard by `hash(key) & shard_mask`. Shards lock
/// independently, so operations on different shards never contend.
///
/// Cloning is cheap: clones share the same shards.
///
/// # Examples
///
/// ```
/// use exist_cache::{Context, ExistCache};
///
/// let cache = ExistCache::builder()
///     .loader(|_: &Context, id: i64| id % 2 == 0)
///     .shard_count(16)
///     .build()
///     .expect("valid configuration");
///
/// let ctx = Context::background();
/// assert!(cache.has(&ctx, 2));
/// assert!(!cache.has(&ctx, 3));
///
/// cache.set(&ctx, 3);
/// assert!(cache.has(&ctx, 3));
/// assert_eq!(cache.len(), 2);
/// ```
#[derive(Clone)]
pub struct ExistCache {
    shards: Arc<[Shard]>,
    config: Arc<ShardConfig>,
}

impl std::fmt::Debug for ExistCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistCache")
            .field("config", &self.config)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ExistCache {
    /// Creates a new builder for configuring an `ExistCache`.
    #[must_use]
    pub fn builder() -> ExistCacheBuilder {
        ExistCacheBuilder::new()
    }

    pub(crate) fn new(config: ShardConfig) -> Self {
        let config = Arc::new(config);
        let shards = (0..config.shard_count).map(|_| Shard::new(Arc::clone(&config))).collect();

        tracing::debug!(
            shard_count = config.shard_count,
            capacity = config.capacity,
            eviction = config.eviction,
            "exist cache constructed"
        );

        Self { shards, config }
    }

    /// Reports whether `key` exists.
    ///
    /// Known keys answer from memory. Unknown keys are checked with the loader, which
    /// receives `ctx`; a positive answer is remembered, a negative one is not. Concurrent
    /// calls for the same unknown key share a single loader call and all return its result.
    ///
    /// Without a loader, only keys seeded through [`set`](Self::set) are reported.
    #[must_use]
    pub fn has(&self, ctx: &Context, key: i64) -> bool {
        self.shard_for(key).has(ctx, key)
    }

    /// Records that `key` exists without consulting the loader. Idempotent.
    pub fn set(&self, _ctx: &Context, key: i64) {
        self.shard_for(key).set(key);
    }

    /// The validated configuration this cache was built from.
    #[must_use]
    pub fn config(&self) -> &ShardConfig {
        &self.config
    }

    /// Returns the number of shards.
    #[must_use]
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Returns the per-shard capacity hint.
    #[must_use]
    pub fn capacity_per_shard(&self) -> usize {
        self.config.capacity
    }

    /// Returns the index of the shard that owns `key`.
    ///
    /// Stable for the lifetime of the cache.
    #[must_use]
    pub fn shard_index(&self, key: i64) -> usize {
        self.config.shard_index(key)
    }

    /// Returns the total number of resident keys, present and stale, across all shards.
    ///
    /// Note: This acquires every shard lock in turn, so it may not be suitable for
    /// high-frequency calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Returns `true` if no shard holds any key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns per-shard counts, indexed like [`shard_index`](Self::shard_index).
    #[must_use]
    pub fn shard_stats(&self) -> Vec<ShardStats> {
        self.shards.iter().map(Shard::stats).collect()
    }

    pub(crate) fn shard(&self, index: usize) -> &Shard {
        &self.shards[index]
    }

    fn shard_for(&self, key: i64) -> &Shard {
        self.shard(self.shard_index(key))
    }
}
