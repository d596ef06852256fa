// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration errors.

use thiserror::Error;

/// A specialized `Result` type for cache construction.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The cache configuration was rejected during validation.
///
/// Only structural problems that cannot be corrected are reported here. Every other
/// out-of-range option is clamped to a safe value instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Shard routing masks the key hash, which requires a power-of-two shard count.
    #[error("shard count must be a power of two, got {0}")]
    ShardCountNotPowerOfTwo(usize),
}
