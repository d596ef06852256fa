// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A sharded, load-deduplicating cache for monotonic existence checks.
//!
//! This crate provides [`ExistCache`], which answers "does identifier K exist?" for 64-bit
//! identifiers whose existence never flips back, such as account ids. Confirming existence
//! is assumed to be expensive (a database query, a remote call), so positive answers are
//! kept and concurrent lookups for the same identifier are coalesced.
//!
//! # Architecture
//!
//! - **Sharding:** Keys are partitioned across a power-of-two number of shards by
//!   `hash(key) & (shard_count - 1)`. Each shard has its own lock.
//! - **Load deduplication:** Concurrent misses for the same key on a shard trigger one
//!   [`Loader`] call; the other callers block until it finishes and receive the same answer.
//!   Misses for different keys load in parallel.
//! - **No negative caching:** A `false` from the loader is not remembered, so the next miss
//!   tries again.
//! - **Two-generation eviction:** Optionally, each shard keeps a *present* and a *stale*
//!   generation. When the present generation reaches the capacity hint it becomes the stale
//!   one and the old stale generation is dropped. Touching a stale key promotes it back.
//!   This approximates LRU without any per-entry metadata and bounds a shard to twice its
//!   capacity.
//!
//! # Example
//!
//! ```
//! use exist_cache::{Context, ExistCache};
//!
//! let cache = ExistCache::builder()
//!     .loader(|_: &Context, id: i64| id % 2 == 0)
//!     .size(1_000_000)
//!     .eviction(true)
//!     .build()
//!     .expect("default shard count is a power of two");
//!
//! let ctx = Context::background();
//! assert!(cache.has(&ctx, 2));
//! assert!(!cache.has(&ctx, 1));
//!
//! // Keys known to exist can be seeded without a lookup.
//! cache.set(&ctx, 1);
//! assert!(cache.has(&ctx, 1));
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events: cache construction and generation rollover at
//! `DEBUG`, load start, join and completion at `TRACE`, and abandoned loads at `WARN`.

mod cache;
mod config;
mod context;
mod error;
mod flight;
mod hasher;
mod loader;
mod shard;

pub use cache::ExistCache;
pub use config::{DEFAULT_SHARD_COUNT, ExistCacheBuilder, MIN_SHARD_CAPACITY, ShardConfig};
pub use context::{CancelHandle, Context};
pub use error::{ConfigError, Result};
pub use hasher::{FoldHasher, KeyHasher, Xxh3Hasher};
pub use loader::Loader;
pub use shard::ShardStats;
