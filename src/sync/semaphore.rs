// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Counting semaphore
//!
//! The value counts available units; a negative value is the number of
//! threads sleeping in [`Semaphore::p`].

use core::sync::atomic::{AtomicI32, Ordering};

use super::Synchronizer;
use crate::sched::Kernel;
use crate::traits::Arch;

/// Counting semaphore
pub struct Semaphore<A: Arch> {
    sync: Synchronizer<A>,
    value: AtomicI32,
}

impl<A: Arch> Semaphore<A> {
    /// Create a semaphore holding `value` units
    pub fn new(kernel: &Kernel<A>, value: i32) -> Self {
        Self {
            sync: Synchronizer::new(kernel),
            value: AtomicI32::new(value),
        }
    }

    /// Take a unit, sleeping until one is available
    pub fn p(&self) {
        let guard = self.sync.begin_atomic();
        if self.sync.fdec(&self.value) < 1 {
            self.sync.end_atomic(self.sync.sleep_in(guard));
        } else {
            self.sync.end_atomic(guard);
        }
    }

    /// Return a unit, waking one sleeper if any
    pub fn v(&self) {
        let guard = self.sync.begin_atomic();
        if self.sync.finc(&self.value) < 0 {
            self.sync.wakeup_in(guard);
        } else {
            self.sync.end_atomic(guard);
        }
    }

    /// Current value
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    /// Number of threads sleeping in `p`
    pub fn waiters(&self) -> usize {
        self.sync.waiters()
    }
}
