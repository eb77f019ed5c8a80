// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # kthread - Thread Scheduling Core
//!
//! The scheduling and blocking-synchronization core of a small real-time
//! kernel:
//!
//! - **Thread control blocks** kept in a per-kernel arena, addressed by [`ThreadId`]
//! - **Scheduling queues**: a priority-ordered ready set, a suspended set and
//!   one private waiting set per synchronizer, all FIFO among equal priorities
//! - **Dispatch protocol**: cooperative, optionally preemptive, under one
//!   kernel lock that is carried through every context switch
//! - **Synchronizers**: [`Synchronizer`] and the [`Mutex`], [`Semaphore`] and
//!   [`Condition`] built on it
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── arch/              # Architecture backends (host backend under `std`)
//! ├── sched/             # TCB, queues, scheduler operations
//! ├── sync/              # Atomics, kernel spinlock, synchronizers
//! ├── tests/             # Integration tests on the host backend
//! ├── traits.rs          # The `Arch` collaborator contract
//! ├── config.rs          # Kernel configuration
//! ├── error.rs           # Error type
//! └── lib.rs             # This file
//! ```
//!
//! ## Booting a kernel
//!
//! ```ignore
//! use kthread::{HostArch, Kernel, KernelConfig, ThreadConfig};
//!
//! let kernel = Kernel::boot(HostArch::new(), KernelConfig::default())?;
//! let worker = kernel.spawn(ThreadConfig::new(), |_| 42)?;
//! assert_eq!(worker.join(), Ok(42));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

// The collaborator contract implemented by architecture backends
pub mod traits;

// Architecture backends
pub mod arch;

// Kernel configuration
pub mod config;

// Error type
pub mod error;

// Scheduler and thread management
pub mod sched;

// Synchronization primitives
pub mod sync;

pub use traits::{Arch, ThreadStart};

pub use config::{KernelConfig, DEFAULT_STACK_SIZE, MIN_STACK_SIZE};

pub use error::{KernelError, Result};

// Re-export scheduler types
pub use sched::{
    Kernel, KernelGuard, SchedSnapshot, SchedState,
    Thread, ThreadConfig, ThreadId, StartState, Stack,
    ThreadState, ThreadQueue, Priority, WaitQueueId,
};

// Re-export synchronization types
pub use sync::{
    SpinLock, SpinLockGuard,
    Synchronizer,
    Mutex, Semaphore, Condition,
};

#[cfg(feature = "std")]
pub use arch::host::{HostArch, HostContext, MachineEvent};

// Integration tests (only compiled in test mode, on the host backend)
#[cfg(all(test, feature = "std"))]
mod tests;
