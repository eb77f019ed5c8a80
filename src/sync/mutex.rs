// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Blocking mutex
//!
//! A contended [`Mutex::lock`] sleeps instead of spinning. On unlock the
//! mutex is handed straight to the first sleeper: `locked` stays raised, so
//! a thread arriving in between cannot barge ahead.

use core::sync::atomic::{AtomicBool, Ordering};

use super::Synchronizer;
use crate::sched::{Kernel, KernelGuard};
use crate::traits::Arch;

/// Blocking mutual exclusion lock
///
/// Carries no data and tracks no owner; pair `lock` and `unlock` yourself.
pub struct Mutex<A: Arch> {
    sync: Synchronizer<A>,
    locked: AtomicBool,
}

impl<A: Arch> Mutex<A> {
    /// Create an unlocked mutex
    pub fn new(kernel: &Kernel<A>) -> Self {
        Self {
            sync: Synchronizer::new(kernel),
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire, sleeping while another thread holds the mutex
    pub fn lock(&self) {
        let guard = self.sync.begin_atomic();
        if self.sync.tsl(&self.locked) {
            self.sync.end_atomic(self.sync.sleep_in(guard));
        } else {
            self.sync.end_atomic(guard);
        }
    }

    /// Release, handing the mutex to the first sleeper if there is one
    pub fn unlock(&self) {
        let guard = self.sync.begin_atomic();
        if self.sync.has_waiters(&guard) {
            self.sync.wakeup_in(guard);
        } else {
            self.locked.store(false, Ordering::Release);
            self.sync.end_atomic(guard);
        }
    }

    /// Check if the mutex is held
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Release without leaving the caller's atomic section
    pub(crate) fn release_in(&self, guard: &mut KernelGuard<'_, A>) {
        if !self.sync.hand_off(guard) {
            self.locked.store(false, Ordering::Release);
        }
    }

    pub(crate) fn kernel(&self) -> &Kernel<A> {
        self.sync.kernel()
    }
}
