// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler and thread management
//!
//! Thread control blocks, the scheduling queues and every operation that
//! moves a thread between them.
//!
//! # Example
//! ```ignore
//! use kthread::{HostArch, Kernel, KernelConfig, ThreadConfig};
//!
//! let kernel = Kernel::boot(HostArch::new(), KernelConfig::default())?;
//! let worker = kernel.spawn(ThreadConfig::new(), |kernel| {
//!     kernel.yield_now();
//!     7
//! })?;
//! assert_eq!(worker.join(), Ok(7));
//! ```

pub mod thread;
pub mod scheduler;
pub mod state;

pub use thread::{Thread, ThreadId, ThreadConfig, StartState, Stack};
pub use scheduler::{Kernel, KernelGuard, SchedSnapshot, SchedState};
pub use state::{ThreadState, ThreadQueue, Priority, WaitQueueId};
