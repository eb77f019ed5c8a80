// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread representation and management
//!
//! Defines the thread control block, its stack, and the [`Thread`] handle
//! that owns a spawned thread.

use alloc::boxed::Box;
use alloc::vec;
use core::fmt;
use core::mem::size_of;

use super::scheduler::Kernel;
use super::state::{Link, Priority, ThreadState};
use crate::error::Result;
use crate::traits::Arch;

/// Thread ID
///
/// Ids are handed out by a counter per kernel and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

const STATUS_BYTES: usize = size_of::<i32>();

/// Thread stack
///
/// Exclusively owned by one thread. Once the thread finishes, the word at
/// the base holds its exit status.
pub struct Stack {
    region: Box<[u8]>,
}

impl Stack {
    /// Allocate a zeroed stack of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            region: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Size of the stack in bytes
    pub fn len(&self) -> usize {
        self.region.len()
    }

    /// Check if the stack has no bytes at all
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Lowest address of the region
    pub fn base(&self) -> *const u8 {
        self.region.as_ptr()
    }

    /// One past the highest address (stacks grow down from here)
    pub fn top(&self) -> *const u8 {
        self.region.as_ptr_range().end
    }

    pub(crate) fn set_exit_status(&mut self, status: i32) {
        self.region[..STATUS_BYTES].copy_from_slice(&status.to_ne_bytes());
    }

    pub(crate) fn exit_status(&self) -> i32 {
        let mut word = [0u8; STATUS_BYTES];
        word.copy_from_slice(&self.region[..STATUS_BYTES]);
        i32::from_ne_bytes(word)
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("base", &self.base())
            .field("size", &self.len())
            .finish()
    }
}

/// Thread control block
pub(crate) struct Tcb<C> {
    pub(crate) id: ThreadId,
    pub(crate) state: ThreadState,
    pub(crate) priority: Priority,
    pub(crate) stack: Stack,
    /// Boxed so the arch can keep raw pointers to it across arena changes
    pub(crate) context: Box<C>,
    pub(crate) link: Link,
    /// Thread blocked in `join` on this one, if any
    pub(crate) join_waiter: Option<ThreadId>,
}

impl<C> Tcb<C> {
    pub(crate) fn new(
        id: ThreadId,
        state: ThreadState,
        priority: Priority,
        stack: Stack,
        context: C,
    ) -> Self {
        Self {
            id,
            state,
            priority,
            stack,
            context: Box::new(context),
            link: Link::None,
            join_waiter: None,
        }
    }
}

/// State a spawned thread starts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartState {
    /// Queued for the processor right away
    #[default]
    Ready,
    /// Parked until [`Thread::resume`]
    Suspended,
}

/// Thread creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadConfig {
    /// Queue rank
    pub priority: Priority,
    /// Stack size in bytes; `None` uses the kernel default
    pub stack_size: Option<usize>,
    /// Initial state
    pub start: StartState,
}

impl ThreadConfig {
    /// Ready, normal priority, default stack
    pub const fn new() -> Self {
        Self {
            priority: Priority::NORMAL,
            stack_size: None,
            start: StartState::Ready,
        }
    }

    /// Set the priority
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the stack size
    pub const fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Start suspended
    pub const fn suspended(mut self) -> Self {
        self.start = StartState::Suspended;
        self
    }
}

/// Owning handle of a spawned thread
///
/// Dropping the handle destroys the thread: it is unlinked from whatever
/// queue holds it, its joiner (if any) is resumed, and its stack is freed.
/// A thread must not be destroyed while it is running; retire it with
/// [`Kernel::exit`] first.
pub struct Thread<A: Arch> {
    kernel: Kernel<A>,
    id: ThreadId,
}

impl<A: Arch> Thread<A> {
    pub(crate) fn new(kernel: Kernel<A>, id: ThreadId) -> Self {
        Self { kernel, id }
    }

    /// Thread id
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Kernel the thread belongs to
    pub fn kernel(&self) -> &Kernel<A> {
        &self.kernel
    }

    /// Current state
    pub fn state(&self) -> ThreadState {
        self.kernel.expect_state(self.id)
    }

    /// Current priority
    pub fn priority(&self) -> Priority {
        self.kernel.expect_priority(self.id)
    }

    /// Change the priority, re-placing the thread in its queue
    ///
    /// See [`Kernel::set_priority`].
    pub fn set_priority(&self, priority: Priority) -> Result<()> {
        self.kernel.set_priority(self.id, priority)
    }

    /// Block until the thread finishes and return its exit status
    ///
    /// Only one thread may wait on a given thread at a time.
    pub fn join(&self) -> Result<i32> {
        self.kernel.join_thread(self.id)
    }

    /// Hand the processor straight to this thread
    pub fn pass(&self) -> Result<()> {
        self.kernel.pass_to(self.id)
    }

    /// Move the thread to the suspended queue
    pub fn suspend(&self) -> Result<()> {
        self.kernel.suspend_thread(self.id)
    }

    /// Move a suspended thread back to the ready queue
    pub fn resume(&self) -> Result<()> {
        self.kernel.resume_thread(self.id)
    }
}

impl<A: Arch> fmt::Debug for Thread<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread").field("id", &self.id).finish()
    }
}

impl<A: Arch> Drop for Thread<A> {
    fn drop(&mut self) {
        self.kernel.destroy(self.id);
    }
}
