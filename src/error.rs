// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel error type

use thiserror::Error;

use crate::sched::{ThreadId, ThreadState};

/// Errors reported by scheduling operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The thread id names no control block in this kernel
    #[error("thread {0} does not exist")]
    NoSuchThread(ThreadId),

    /// The requested stack cannot hold a thread
    #[error("stack of {requested} bytes is below the {minimum}-byte minimum")]
    StackTooSmall { requested: usize, minimum: usize },

    /// A thread tried to join itself
    #[error("thread {0} cannot join itself")]
    JoinSelf(ThreadId),

    /// Only one joiner is tracked per thread
    #[error("thread {target} is already joined by thread {joiner}")]
    JoinInProgress { target: ThreadId, joiner: ThreadId },

    /// The operation is not valid in the thread's current state
    #[error("thread {thread} cannot do this while {state:?}")]
    InvalidState { thread: ThreadId, state: ThreadState },

    /// The architecture could not provide an execution context
    #[error("no execution context available for a new thread")]
    ContextUnavailable,
}

/// Result alias for scheduling operations
pub type Result<T> = core::result::Result<T, KernelError>;
