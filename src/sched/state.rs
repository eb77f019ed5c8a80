// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread state and scheduling queues
//!
//! Defines thread states, priorities and the queue type shared by the ready
//! set, the suspended set and every synchronizer's waiting set.

use alloc::collections::VecDeque;
use core::fmt;

use super::thread::ThreadId;

/// Thread states
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Thread owns the processor
    Running,
    /// Thread is in the ready queue
    Ready,
    /// Thread is in the suspended queue
    Suspended,
    /// Thread is parked in a synchronizer's waiting queue
    Waiting,
    /// Thread has exited; its stack holds the exit status
    Finishing,
}

/// Thread priority
///
/// A plain rank: lower values are placed earlier in every queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// Most urgent named rank
    pub const HIGH: Self = Self(0);
    /// Default rank
    pub const NORMAL: Self = Self(15);
    /// Background work
    pub const LOW: Self = Self(31);
    /// Worst rank an ordinary thread can hold; requests past it are clamped
    pub const LOWEST: Self = Self(i32::MAX - 1);
    /// Reserved for the idle thread, behind every other thread
    pub const IDLE: Self = Self(i32::MAX);

    /// Rank an ordinary thread actually gets for this request
    pub(crate) fn for_thread(self) -> Self {
        self.min(Self::LOWEST)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Handle of a synchronizer's waiting queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaitQueueId(pub(crate) u64);

impl fmt::Display for WaitQueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wq{}", self.0)
    }
}

/// Which queue a thread is linked into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    /// Running or finished: in no queue
    None,
    Ready,
    Suspended,
    /// Parked in this waiting queue
    Waiting(WaitQueueId),
}

/// Queue entry
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    thread: ThreadId,
    rank: Priority,
}

/// Thread queue
///
/// Ordered by priority; threads of equal priority keep their insertion
/// order, so the earliest inserted is removed first.
#[derive(Debug, Default)]
pub struct ThreadQueue {
    entries: VecDeque<QueueEntry>,
}

impl ThreadQueue {
    /// Create a new empty queue
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Insert a thread behind every entry of equal or better rank
    pub fn insert(&mut self, thread: ThreadId, rank: Priority) {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.rank > rank)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, QueueEntry { thread, rank });
    }

    /// Remove and return the head
    pub fn remove_head(&mut self) -> Option<ThreadId> {
        self.entries.pop_front().map(|entry| entry.thread)
    }

    /// Remove a specific thread; no-op if absent
    pub fn remove(&mut self, thread: ThreadId) -> bool {
        match self.entries.iter().position(|entry| entry.thread == thread) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Peek at the head
    pub fn head(&self) -> Option<ThreadId> {
        self.entries.front().map(|entry| entry.thread)
    }

    /// Check if a thread is queued
    pub fn contains(&self, thread: ThreadId) -> bool {
        self.entries.iter().any(|entry| entry.thread == thread)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of queued threads
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Queued threads, head first
    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.entries.iter().map(|entry| entry.thread)
    }
}

// ============================================================================
// Tests
// ============================================================================
