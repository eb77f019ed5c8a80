// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Synchronizer
//!
//! Common base of every blocking primitive: the atomic operations, a scoped
//! kernel lock, and one private waiting queue threads can sleep on.
//!
//! # Usage
//!
//! A primitive takes [`Synchronizer::begin_atomic`], inspects its own atomic
//! state, then either leaves the section or parks the caller with
//! [`Synchronizer::sleep_in`]. Deciding and sleeping under one lock
//! acquisition is what keeps a wakeup from slipping in between.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicI32};

use super::atomic;
use crate::sched::{Kernel, KernelGuard, WaitQueueId};
use crate::traits::Arch;

/// Atomic primitives plus a private waiting queue
pub struct Synchronizer<A: Arch> {
    kernel: Kernel<A>,
    sleeping: WaitQueueId,
}

impl<A: Arch> Synchronizer<A> {
    /// Create a synchronizer with an empty waiting queue in `kernel`
    pub fn new(kernel: &Kernel<A>) -> Self {
        Self {
            kernel: kernel.clone(),
            sleeping: kernel.create_wait_queue(),
        }
    }

    /// Kernel the waiting queue lives in
    pub fn kernel(&self) -> &Kernel<A> {
        &self.kernel
    }

    /// Test-and-set
    pub fn tsl(&self, lock: &AtomicBool) -> bool {
        atomic::tsl(lock)
    }

    /// Fetch-and-increment
    pub fn finc(&self, number: &AtomicI32) -> i32 {
        atomic::finc(number)
    }

    /// Fetch-and-decrement
    pub fn fdec(&self, number: &AtomicI32) -> i32 {
        atomic::fdec(number)
    }

    /// Enter an atomic section
    ///
    /// The section lasts as long as the returned guard.
    pub fn begin_atomic(&self) -> KernelGuard<'_, A> {
        self.kernel.lock()
    }

    /// Leave an atomic section
    pub fn end_atomic(&self, guard: KernelGuard<'_, A>) {
        drop(guard);
    }

    /// Park the running thread until woken
    pub fn sleep(&self) {
        let guard = self.begin_atomic();
        self.end_atomic(self.sleep_in(guard));
    }

    /// Park the running thread from inside an atomic section
    ///
    /// Returns inside the section once the thread runs again.
    pub fn sleep_in<'a>(&self, guard: KernelGuard<'a, A>) -> KernelGuard<'a, A> {
        self.kernel.sleep(guard, self.sleeping)
    }

    /// Ready the longest-waiting sleeper, if any
    pub fn wakeup(&self) {
        self.wakeup_in(self.begin_atomic());
    }

    /// Ready one sleeper and leave the atomic section
    pub fn wakeup_in(&self, guard: KernelGuard<'_, A>) {
        self.kernel.wakeup(guard, self.sleeping);
    }

    /// Ready every sleeper
    pub fn wakeup_all(&self) {
        self.wakeup_all_in(self.begin_atomic());
    }

    /// Ready every sleeper and leave the atomic section
    pub fn wakeup_all_in(&self, guard: KernelGuard<'_, A>) {
        self.kernel.wakeup_all(guard, self.sleeping);
    }

    /// Ready one sleeper without leaving the atomic section
    ///
    /// Never reschedules. Returns `false` if nobody was waiting.
    pub fn hand_off(&self, guard: &mut KernelGuard<'_, A>) -> bool {
        guard.wake_one(self.sleeping).is_some()
    }

    /// Check for sleepers from inside an atomic section
    pub fn has_waiters(&self, guard: &KernelGuard<'_, A>) -> bool {
        guard.waiters(self.sleeping) > 0
    }

    /// Number of sleepers
    pub fn waiters(&self) -> usize {
        self.begin_atomic().waiters(self.sleeping)
    }

    /// Waiting queue this synchronizer parks threads on
    ///
    /// Matches the ids in [`SchedSnapshot::waiting`](crate::SchedSnapshot),
    /// so its sleepers can be read back with
    /// [`SchedSnapshot::waiting_on`](crate::SchedSnapshot::waiting_on).
    pub fn queue_id(&self) -> WaitQueueId {
        self.sleeping
    }
}

impl<A: Arch> fmt::Debug for Synchronizer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("queue", &self.sleeping)
            .finish()
    }
}

impl<A: Arch> Drop for Synchronizer<A> {
    fn drop(&mut self) {
        // Nobody can wake these threads once the queue is gone.
        self.kernel.retire_wait_queue(self.sleeping);
    }
}
