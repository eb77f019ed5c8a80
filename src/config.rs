// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel configuration
//!
//! Defaults follow the `preemptive` and `reboot` cargo features so a board
//! can pick its policy at build time; tests override them per kernel.

/// Stack size used when a thread does not ask for one
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024;

/// Smallest stack a thread may be created with
///
/// The base of a finished thread's stack holds its exit status, so this is
/// never below `size_of::<i32>()`.
pub const MIN_STACK_SIZE: usize = 256;

/// Kernel-wide scheduling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Force a reschedule after every wakeup and on every timer tick
    pub preemptive: bool,
    /// Reboot rather than halt when no thread can ever run again
    pub reboot: bool,
    /// Stack size for threads that do not request one
    pub default_stack_size: usize,
}

impl KernelConfig {
    /// Configuration selected by the enabled cargo features
    pub const fn new() -> Self {
        Self {
            preemptive: cfg!(feature = "preemptive"),
            reboot: cfg!(feature = "reboot"),
            default_stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Set preemptive mode
    pub const fn preemptive(mut self, preemptive: bool) -> Self {
        self.preemptive = preemptive;
        self
    }

    /// Set the terminal action of the idle thread
    pub const fn reboot(mut self, reboot: bool) -> Self {
        self.reboot = reboot;
        self
    }

    /// Set the default stack size
    pub const fn default_stack_size(mut self, size: usize) -> Self {
        self.default_stack_size = size;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
