// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Architecture collaborator contract
//!
//! The scheduling core never touches registers, interrupt vectors or the
//! power controller itself. Each architecture backend implements [`Arch`]
//! and the kernel drives it:
//!
//! - **Context creation**: a context bound to a stack and a start routine
//! - **Dispatch**: save one context, restore another
//! - **Idle path**: wait for an interrupt, halt, reboot

use alloc::boxed::Box;

use crate::error::Result;
use crate::sched::Stack;

/// Routine a new context runs the first time it is switched to
///
/// It never returns: it ends by retiring its thread through
/// [`Arch::switch_final`].
pub type ThreadStart = Box<dyn FnOnce() + Send + 'static>;

/// Trait for architecture backends
///
/// Implementations:
/// - host: [`HostArch`](crate::HostArch), one OS thread per kernel thread
pub trait Arch: Send + Sync + 'static {
    /// Saved execution context of one thread
    type Context: Send;

    /// Context describing the code that is already executing at boot
    ///
    /// The kernel records it for the main thread; it is only ever saved
    /// into, never started.
    fn bootstrap_context(&self) -> Self::Context;

    /// Create a context that will run `start` on `stack`
    ///
    /// # Returns
    /// * `Ok(context)` ready to be switched to
    /// * `Err(KernelError::ContextUnavailable)` if the backend ran out of resources
    fn init_context(&self, stack: &Stack, start: ThreadStart) -> Result<Self::Context>;

    /// Save the executing context into `prev` and resume `next`
    ///
    /// This is a suspension point, not an ordinary call: it returns to its
    /// caller only once some later switch names `prev` as its `next`, possibly
    /// long after and from a different thread's call path. A context that is
    /// never switched back to never returns from here.
    ///
    /// # Safety
    ///
    /// Both pointers must reference live contexts owned by the calling kernel,
    /// `prev` must describe the code making this call, and the kernel lock
    /// must be held.
    unsafe fn switch_context(&self, prev: *mut Self::Context, next: *const Self::Context);

    /// Leave a finished thread for good and resume `next`
    ///
    /// Called from the start routine once its entry has returned, so no
    /// caller frames remain above it. A backend may release whatever backs
    /// `prev` once that context is dropped. The default just switches.
    ///
    /// # Safety
    ///
    /// Same as [`Arch::switch_context`]. `prev` is never switched to again.
    unsafe fn switch_final(&self, prev: *mut Self::Context, next: *const Self::Context) -> ! {
        unsafe { self.switch_context(prev, next) };
        panic!("finished context was resumed");
    }

    /// Stop the processor until the next interrupt
    fn wait_for_interrupt(&self);

    /// Stop the processor for good
    fn halt_forever(&self) -> !;

    /// Restart the machine
    fn reboot(&self) -> !;
}
