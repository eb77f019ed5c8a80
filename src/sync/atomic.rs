// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Atomic Primitives
//!
//! Test-and-set and fetch-and-increment/decrement. Each is one indivisible
//! read-modify-write, so it holds against interrupts on this core and
//! against any other execution context.

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Test-and-set: raise `lock` and return its previous value
///
/// `false` means the caller is the one that raised it.
#[inline]
pub fn tsl(lock: &AtomicBool) -> bool {
    lock.swap(true, Ordering::AcqRel)
}

/// Fetch-and-increment: add one to `number` and return the previous value
#[inline]
pub fn finc(number: &AtomicI32) -> i32 {
    number.fetch_add(1, Ordering::AcqRel)
}

/// Fetch-and-decrement: subtract one from `number` and return the previous value
#[inline]
pub fn fdec(number: &AtomicI32) -> i32 {
    number.fetch_sub(1, Ordering::AcqRel)
}
