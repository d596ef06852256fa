// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Key hashing used for shard routing.
//!
//! A [`KeyHasher`] must be pure: the same key always produces the same hash for the
//! lifetime of a cache, otherwise `has` and `set` could disagree about which shard owns
//! a key.

use std::hash::BuildHasher;

use foldhash::fast::FixedState;

/// Maps an identifier to the 64-bit hash used to pick its shard.
///
/// Only the low bits selected by the shard mask are used, so implementations should mix
/// entropy into them. Any `Fn(i64) -> u64 + Send + Sync` closure is a `KeyHasher`, which
/// is handy in tests:
///
/// ```
/// use exist_cache::{ExistCache, KeyHasher};
///
/// // Route every key to shard 0.
/// let cache = ExistCache::builder().hasher(|_: i64| 0_u64).build().unwrap();
/// assert_eq!(cache.shard_index(42), 0);
/// assert_eq!(cache.shard_index(-7), 0);
/// ```
pub trait KeyHasher: Send + Sync {
    /// Hashes `key`. Must be deterministic.
    fn hash(&self, key: i64) -> u64;
}

impl<F> KeyHasher for F
where
    F: Fn(i64) -> u64 + Send + Sync,
{
    fn hash(&self, key: i64) -> u64 {
        self(key)
    }
}

/// The default hasher: XXH3-64 over the key's little-endian bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh3Hasher;

impl KeyHasher for Xxh3Hasher {
    fn hash(&self, key: i64) -> u64 {
        xxhash_rust::xxh3::xxh3_64(&key.to_le_bytes())
    }
}

/// A faster, lower-quality alternative built on foldhash with a fixed seed.
#[derive(Clone)]
pub struct FoldHasher {
    state: FixedState,
}

impl FoldHasher {
    /// Creates a hasher with the given seed. Equal seeds route keys identically.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: FixedState::with_seed(seed),
        }
    }
}

impl Default for FoldHasher {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl std::fmt::Debug for FoldHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoldHasher").finish_non_exhaustive()
    }
}

impl KeyHasher for FoldHasher {
    fn hash(&self, key: i64) -> u64 {
        self.state.hash_one(key)
    }
}
