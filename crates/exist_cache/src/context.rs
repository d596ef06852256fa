// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cancellation context forwarded to the loader.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Carries cancellation state from a caller of [`ExistCache::has`](crate::ExistCache::has)
/// into the [`Loader`](crate::Loader).
///
/// The cache never inspects the context itself. Whether a load honors cancellation is
/// entirely up to the loader, which can poll [`is_cancelled`](Self::is_cancelled) or read
/// the [`deadline`](Self::deadline) to bound its own I/O.
///
/// Clones share the same cancellation flag.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use exist_cache::Context;
///
/// let (ctx, handle) = Context::background().with_timeout(Duration::from_secs(5)).cancellable();
/// assert!(!ctx.is_cancelled());
///
/// handle.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Context {
    /// Returns a context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a copy of this context that expires at `deadline`.
    ///
    /// An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        self
    }

    /// Returns a copy of this context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Returns a copy of this context that can be cancelled through the returned handle.
    ///
    /// If this context is already cancellable, the new handle replaces the old flag for
    /// the returned context only.
    #[must_use]
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(self.is_cancelled()));
        self.cancelled = Some(Arc::clone(&flag));
        (self, CancelHandle { flag })
    }

    /// Returns `true` once the context was cancelled or its deadline has passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|flag| flag.load(Ordering::Acquire))
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// The instant after which the context counts as cancelled, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Cancels the [`Context`] it was created with, and every clone of it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Marks the associated context as cancelled. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}
