// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache configuration and its validation.

use std::sync::Arc;

use crate::{ConfigError, ExistCache, KeyHasher, Loader, Result, Xxh3Hasher};

/// Shard count used when none is configured.
pub const DEFAULT_SHARD_COUNT: usize = 256;

/// Smallest per-shard capacity hint.
///
/// Tiny generations would rotate on almost every insertion when eviction is enabled.
pub const MIN_SHARD_CAPACITY: usize = 1024;

/// Builder for configuring an [`ExistCache`].
///
/// All setters are optional. Call [`build()`](Self::build) to validate the options and
/// construct the cache, or [`validate()`](Self::validate) to inspect the resulting
/// [`ShardConfig`] first.
///
/// # Examples
///
/// ```
/// use exist_cache::{Context, ExistCache};
///
/// let cache = ExistCache::builder()
///     .loader(|_: &Context, id: i64| id > 0)
///     .shard_count(16)
///     .size(1_000_000)
///     .eviction(true)
///     .build()
///     .expect("16 is a power of two");
///
/// assert_eq!(cache.num_shards(), 16);
/// assert!(cache.has(&Context::background(), 7));
/// ```
pub struct ExistCacheBuilder {
    loader: Option<Arc<dyn Loader>>,
    shard_count: usize,
    hasher: Option<Arc<dyn KeyHasher>>,
    size: Option<usize>,
    eviction: bool,
}

impl Default for ExistCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExistCacheBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistCacheBuilder")
            .field("has_loader", &self.loader.is_some())
            .field("shard_count", &self.shard_count)
            .field("custom_hasher", &self.hasher.is_some())
            .field("size", &self.size)
            .field("eviction", &self.eviction)
            .finish()
    }
}

impl ExistCacheBuilder {
    /// Creates a builder with default settings.
    ///
    /// Defaults:
    /// - no loader: unknown keys report `false` until [`ExistCache::set`] seeds them
    /// - `shard_count`: [`DEFAULT_SHARD_COUNT`]
    /// - `hasher`: [`Xxh3Hasher`]
    /// - per-shard capacity: [`MIN_SHARD_CAPACITY`]
    /// - eviction disabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: None,
            shard_count: 0,
            hasher: None,
            size: None,
            eviction: false,
        }
    }

    /// Sets the authoritative existence check consulted on misses.
    #[must_use]
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Sets the number of shards.
    ///
    /// Must be a power of two; anything else fails validation. Zero selects
    /// [`DEFAULT_SHARD_COUNT`].
    #[must_use]
    pub fn shard_count(mut self, count: usize) -> Self {
        self.shard_count = count;
        self
    }

    /// Sets the hasher used for shard routing.
    #[must_use]
    pub fn hasher(mut self, hasher: impl KeyHasher + 'static) -> Self {
        self.hasher = Some(Arc::new(hasher));
        self
    }

    /// Sets the expected total number of keys.
    ///
    /// The hint is divided across shards and floored at [`MIN_SHARD_CAPACITY`]. Without
    /// eviction it only presizes storage; with eviction it is the per-shard generation size.
    /// Up-front reservation is bounded, so an oversized hint never fails construction.
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Enables or disables two-generation eviction.
    #[must_use]
    pub fn eviction(mut self, enabled: bool) -> Self {
        self.eviction = enabled;
        self
    }

    /// Validates the options, filling in defaults and clamping the capacity hint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ShardCountNotPowerOfTwo`] when the shard count is not a
    /// power of two.
    ///
    /// # Examples
    ///
    /// ```
    /// use exist_cache::{ConfigError, ExistCacheBuilder};
    ///
    /// assert_eq!(ExistCacheBuilder::new().validate().unwrap().shard_mask(), 255);
    /// assert_eq!(ExistCacheBuilder::new().shard_count(16).validate().unwrap().shard_mask(), 15);
    /// assert_eq!(
    ///     ExistCacheBuilder::new().shard_count(100).validate().unwrap_err(),
    ///     ConfigError::ShardCountNotPowerOfTwo(100),
    /// );
    /// ```
    pub fn validate(self) -> Result<ShardConfig> {
        self.validate_with_floor(MIN_SHARD_CAPACITY)
    }

    /// Validates the options and builds the cache.
    ///
    /// # Errors
    ///
    /// Fails for the same reasons as [`validate()`](Self::validate).
    pub fn build(self) -> Result<ExistCache> {
        self.validate().map(ExistCache::new)
    }

    pub(crate) fn validate_with_floor(self, min_capacity: usize) -> Result<ShardConfig> {
        let shard_count = if self.shard_count == 0 {
            DEFAULT_SHARD_COUNT
        } else {
            self.shard_count
        };
        if !shard_count.is_power_of_two() {
            return Err(ConfigError::ShardCountNotPowerOfTwo(shard_count));
        }

        let capacity = self
            .size
            .map_or(min_capacity, |size| size.div_ceil(shard_count))
            .max(min_capacity)
            .max(1);

        let hasher: Arc<dyn KeyHasher> = match self.hasher {
            Some(hasher) => hasher,
            None => Arc::new(Xxh3Hasher),
        };

        Ok(ShardConfig {
            shard_count,
            shard_mask: shard_count - 1,
            capacity,
            eviction: self.eviction,
            hasher,
            loader: self.loader,
        })
    }
}

/// Validated configuration shared read-only by every shard of a cache.
pub struct ShardConfig {
    pub(crate) shard_count: usize,
    pub(crate) shard_mask: usize,
    pub(crate) capacity: usize,
    pub(crate) eviction: bool,
    pub(crate) hasher: Arc<dyn KeyHasher>,
    pub(crate) loader: Option<Arc<dyn Loader>>,
}

impl ShardConfig {
    /// Number of shards, always a power of two.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// `shard_count - 1`, applied to key hashes to pick a shard.
    #[must_use]
    pub fn shard_mask(&self) -> usize {
        self.shard_mask
    }

    /// Per-shard capacity hint. Enforced as the generation size only with eviction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether two-generation eviction is enabled.
    #[must_use]
    pub fn eviction(&self) -> bool {
        self.eviction
    }

    /// Whether a loader was configured.
    #[must_use]
    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "only the low bits kept by the shard mask are used"
    )]
    pub(crate) fn shard_index(&self, key: i64) -> usize {
        self.hasher.hash(key) as usize & self.shard_mask
    }
}

impl std::fmt::Debug for ShardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardConfig")
            .field("shard_count", &self.shard_count)
            .field("shard_mask", &self.shard_mask)
            .field("capacity", &self.capacity)
            .field("eviction", &self.eviction)
            .field("has_loader", &self.has_loader())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExistCacheBuilder::new().validate().expect("defaults are valid");
        assert_eq!(config.shard_count(), 256);
        assert_eq!(config.shard_mask(), 255);
        assert_eq!(config.capacity(), MIN_SHARD_CAPACITY);
        assert!(!config.eviction());
        assert!(!config.has_loader());
    }

    #[test]
    fn power_of_two_shard_count_sets_mask() {
        let config = ExistCacheBuilder::new().shard_count(16).validate().expect("16 is valid");
        assert_eq!(config.shard_count(), 16);
        assert_eq!(config.shard_mask(), 15);

        let single = ExistCacheBuilder::new().shard_count(1).validate().expect("1 is valid");
        assert_eq!(single.shard_mask(), 0);
    }

    #[test]
    fn non_power_of_two_shard_count_is_rejected() {
        for count in [3, 100, 255, 257] {
            let error = ExistCacheBuilder::new().shard_count(count).validate().expect_err("not a power of two");
            assert_eq!(error, ConfigError::ShardCountNotPowerOfTwo(count));
        }
    }

    #[test]
    fn zero_shard_count_falls_back_to_default() {
        let config = ExistCacheBuilder::new().shard_count(0).validate().expect("zero means default");
        assert_eq!(config.shard_count(), DEFAULT_SHARD_COUNT);
    }

    #[test]
    fn size_hint_is_split_across_shards() {
        let config = ExistCacheBuilder::new()
            .shard_count(4)
            .size(1_000_000)
            .validate()
            .expect("valid");
        assert_eq!(config.capacity(), 250_000);

        let uneven = ExistCacheBuilder::new().shard_count(4).size(10_001).validate_with_floor(1).expect("valid");
        assert_eq!(uneven.capacity(), 2_501);
    }

    #[test]
    fn small_size_hint_is_floored() {
        let config = ExistCacheBuilder::new().shard_count(2).size(10).validate().expect("valid");
        assert_eq!(config.capacity(), MIN_SHARD_CAPACITY);

        let zero = ExistCacheBuilder::new().size(0).validate_with_floor(0).expect("valid");
        assert_eq!(zero.capacity(), 1);
    }

    #[test]
    fn oversized_size_hint_still_builds() {
        let config = ExistCacheBuilder::new().shard_count(1).size(usize::MAX).validate().expect("valid");
        assert_eq!(config.capacity(), usize::MAX);

        let cache = ExistCacheBuilder::new()
            .shard_count(4)
            .size(usize::MAX)
            .eviction(true)
            .build()
            .expect("an oversized hint is not fatal");
        let ctx = crate::Context::background();
        cache.set(&ctx, 1);
        assert!(cache.has(&ctx, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn loader_and_eviction_are_recorded() {
        let config = ExistCacheBuilder::new()
            .loader(|_: &crate::Context, _: i64| true)
            .eviction(true)
            .validate()
            .expect("valid");
        assert!(config.has_loader());
        assert!(config.eviction());
    }

    #[test]
    fn routing_uses_mask_of_configured_hasher() {
        let config = ExistCacheBuilder::new()
            .shard_count(8)
            .hasher(|key: i64| key.unsigned_abs())
            .validate()
            .expect("valid");
        assert_eq!(config.shard_index(3), 3);
        assert_eq!(config.shard_index(11), 3);
        assert_eq!(config.shard_index(8), 0);
    }

    #[test]
    fn debug_output_omits_callbacks() {
        let builder = ExistCacheBuilder::new().loader(|_: &crate::Context, _: i64| false);
        assert!(format!("{builder:?}").contains("has_loader: true"));

        let config = builder.validate().expect("valid");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("shard_mask: 255"), "got: {rendered}");
    }
}
