// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Integration Tests
//!
//! Each test boots its own kernel on the host backend, with the test thread
//! as the main thread. Kernel threads only record what they observe in a
//! journal; every assertion runs on the main thread, since a kernel thread
//! that panics takes the process down.

use std::sync::Arc;

use crate::{HostArch, Kernel, KernelConfig};

mod scheduling_tests;

/// Shared log of what kernel threads observed
pub(crate) type Journal<T> = Arc<spin::Mutex<Vec<T>>>;

pub(crate) fn journal<T>() -> Journal<T> {
    Arc::new(spin::Mutex::new(Vec::new()))
}

pub(crate) fn record<T>(journal: &Journal<T>, entry: T) {
    journal.lock().push(entry);
}

pub(crate) fn entries<T: Clone>(journal: &Journal<T>) -> Vec<T> {
    journal.lock().clone()
}

/// Cooperative kernel that halts when stranded
pub(crate) fn cooperative() -> KernelConfig {
    KernelConfig::new().preemptive(false).reboot(false)
}

pub(crate) fn boot() -> Kernel<HostArch> {
    boot_with(cooperative())
}

pub(crate) fn boot_with(config: KernelConfig) -> Kernel<HostArch> {
    Kernel::boot(HostArch::new(), config).unwrap()
}
