// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Spinlock
//!
//! A test-and-set spinlock. One instance per kernel guards the whole
//! scheduler state.
//!
//! The guard does not remember which thread took the lock. That is what
//! lets a guard be carried through a context switch: the thread that
//! switches away keeps its guard on its own stack, and the lock is released
//! by whichever thread resumes next, when its own guard is dropped.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use super::atomic::tsl;

/// A test-and-set spinlock
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Create a new, unlocked spinlock
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock, spinning until it becomes available
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        while tsl(&self.locked) {
            core::hint::spin_loop();
        }
        SpinLockGuard { lock: self }
    }

    /// Try to acquire the lock without spinning
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if tsl(&self.locked) {
            None
        } else {
            Some(SpinLockGuard { lock: self })
        }
    }

    /// Take over a lock that is already held
    ///
    /// # Safety
    ///
    /// The lock must be held on behalf of the caller by code that will never
    /// release it itself: a freshly started thread inherits the lock from
    /// the thread that switched to it, and nobody else holds a guard for
    /// that acquisition.
    pub unsafe fn adopt(&self) -> SpinLockGuard<'_, T> {
        debug_assert!(self.is_locked(), "adopting an unlocked spinlock");
        SpinLockGuard { lock: self }
    }

    /// Check if the lock is currently held
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

/// RAII guard for a [`SpinLock`]
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

// ============================================================================
// Tests
// ============================================================================
