// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Condition variable

use super::{Mutex, Synchronizer};
use crate::sched::Kernel;
use crate::traits::Arch;

/// Condition variable used together with a [`Mutex`]
///
/// Signals are not remembered: a `signal` with nobody waiting is lost.
pub struct Condition<A: Arch> {
    sync: Synchronizer<A>,
}

impl<A: Arch> Condition<A> {
    /// Create a condition with no waiters
    pub fn new(kernel: &Kernel<A>) -> Self {
        Self {
            sync: Synchronizer::new(kernel),
        }
    }

    /// Release `mutex` and sleep until signalled, then re-acquire it
    ///
    /// Releasing and going to sleep happen in one atomic section, so a
    /// signal sent by the next holder of `mutex` cannot be missed.
    ///
    /// # Panics
    ///
    /// If `mutex` belongs to another kernel.
    pub fn wait(&self, mutex: &Mutex<A>) {
        assert!(
            mutex.kernel().ptr_eq(self.sync.kernel()),
            "condition and mutex belong to different kernels"
        );
        let mut guard = self.sync.begin_atomic();
        mutex.release_in(&mut guard);
        self.sync.end_atomic(self.sync.sleep_in(guard));
        mutex.lock();
    }

    /// Wake the longest-waiting thread
    pub fn signal(&self) {
        self.sync.wakeup();
    }

    /// Wake every waiting thread
    pub fn broadcast(&self) {
        self.sync.wakeup_all();
    }

    /// Number of waiting threads
    pub fn waiters(&self) -> usize {
        self.sync.waiters()
    }
}
