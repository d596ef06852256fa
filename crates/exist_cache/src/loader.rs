// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The existence check consulted on cache misses.

use crate::Context;

/// The authoritative, possibly expensive existence check behind the cache.
///
/// A loader is called only for keys the cache does not know about, and at most once at
/// a time per key: concurrent misses for the same key wait for the single in-flight call
/// and all observe its result.
///
/// Returning `false` means "not known to exist right now". The cache does not remember
/// negative answers, so a failed lookup should simply return `false` and the next miss
/// will try again. Callers that need to tell "absent" apart from "lookup failed" must
/// track that outside the cache.
///
/// Any `Fn(&Context, i64) -> bool + Send + Sync` closure is a `Loader`.
///
/// # Examples
///
/// ```
/// use exist_cache::{Context, Loader};
///
/// struct Accounts(Vec<i64>);
///
/// impl Loader for Accounts {
///     fn load(&self, ctx: &Context, id: i64) -> bool {
///         !ctx.is_cancelled() && self.0.contains(&id)
///     }
/// }
///
/// let accounts = Accounts(vec![1, 2, 3]);
/// assert!(accounts.load(&Context::background(), 2));
/// assert!(!accounts.load(&Context::background(), 4));
/// ```
pub trait Loader: Send + Sync {
    /// Reports whether `key` exists.
    ///
    /// `ctx` is the context of the caller that triggered the load.
    fn load(&self, ctx: &Context, key: i64) -> bool;
}

impl<F> Loader for F
where
    F: Fn(&Context, i64) -> bool + Send + Sync,
{
    fn load(&self, ctx: &Context, key: i64) -> bool {
        self(ctx, key)
    }
}
