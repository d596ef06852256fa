// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A one-shot result slot shared by every caller waiting on the same load.

use parking_lot::{Condvar, Mutex};

/// The outcome of a single in-flight load, published once by the leader.
///
/// Followers block in [`wait`](Self::wait) until [`complete`](Self::complete) runs.
/// Once completed the slot never changes, so late readers see the same value.
#[derive(Debug, Default)]
pub(crate) struct Flight {
    outcome: Mutex<Option<bool>>,
    done: Condvar,
}

impl Flight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `exists` and wakes every waiter. Only the first call has an effect.
    pub fn complete(&self, exists: bool) {
        let mut outcome = self.outcome.lock();
        if outcome.is_none() {
            *outcome = Some(exists);
            self.done.notify_all();
        }
    }

    /// Blocks until the outcome is published and returns it.
    pub fn wait(&self) -> bool {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(exists) = *outcome {
                return exists;
            }
            self.done.wait(&mut outcome);
        }
    }
}
