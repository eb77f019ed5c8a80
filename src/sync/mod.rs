// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Primitives
//!
//! # Primitives
//!
//! - **atomic**: test-and-set, fetch-and-increment, fetch-and-decrement
//! - **SpinLock**: the kernel lock guarding scheduler state
//! - **Synchronizer**: atomics plus a private waiting queue
//! - **Mutex**, **Semaphore**, **Condition**: blocking primitives built on
//!   [`Synchronizer`]
//!
//! # Design
//!
//! Blocking primitives never touch scheduler queues directly. They decide
//! under [`Synchronizer::begin_atomic`] whether to sleep or wake, and the
//! synchronizer parks or readies threads through the kernel.

pub mod atomic;
pub mod spinlock;
pub mod synchronizer;
pub mod mutex;
pub mod semaphore;
pub mod condition;

// Re-exports
pub use spinlock::{SpinLock, SpinLockGuard};
pub use synchronizer::Synchronizer;
pub use mutex::Mutex;
pub use semaphore::Semaphore;
pub use condition::Condition;
