// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Host backend
//!
//! Runs every kernel thread on its own OS thread. Exactly one of them is
//! ever unparked: a context switch releases the next thread's baton and
//! parks on the caller's own. The kernel's scheduling decisions are
//! therefore the only thing deciding which code runs, as on a single core.
//!
//! There are no interrupts. [`Arch::wait_for_interrupt`] sleeps briefly,
//! and halting or rebooting records a [`MachineEvent`] and parks the
//! calling thread for good.
//!
//! A thread whose entry returned unwinds its OS thread once its context is
//! dropped. A thread destroyed anywhere else stays parked: its frames belong
//! to code that must not run off schedule.

use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex as StdMutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};

use crate::error::{KernelError, Result};
use crate::sched::Stack;
use crate::traits::{Arch, ThreadStart};

/// OS threads never get less stack than this
const HOST_MIN_STACK: usize = 256 * 1024;

/// How long `wait_for_interrupt` stays idle
const IDLE_NAP: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    /// Parked until released
    Wait,
    /// Released; the next park returns at once
    Go,
    /// The context is gone; its thread must never run again
    Retired,
}

/// Per-context run permission
struct Baton {
    turn: StdMutex<Turn>,
    cv: Condvar,
}

impl Baton {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            turn: StdMutex::new(Turn::Wait),
            cv: Condvar::new(),
        })
    }

    fn turn(&self) -> MutexGuard<'_, Turn> {
        self.turn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut turn = self.turn();
        if *turn == Turn::Wait {
            *turn = Turn::Go;
        }
        self.cv.notify_all();
    }

    /// Block until released or retired; consumes a release
    fn park(&self) -> Turn {
        let mut turn = self.turn();
        while *turn == Turn::Wait {
            turn = self.cv.wait(turn).unwrap_or_else(PoisonError::into_inner);
        }
        let seen = *turn;
        if seen == Turn::Go {
            *turn = Turn::Wait;
        }
        seen
    }

    fn retire(&self) {
        *self.turn() = Turn::Retired;
        self.cv.notify_all();
    }
}

/// Saved context of one kernel thread
pub struct HostContext {
    baton: Arc<Baton>,
}

impl Drop for HostContext {
    fn drop(&mut self) {
        self.baton.retire();
    }
}

/// Terminal action taken by the idle thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    Halted,
    Rebooted,
}

struct Machine {
    events: spin::Mutex<Vec<MachineEvent>>,
    /// OS threads spawned for contexts that have not ended yet
    host_threads: AtomicUsize,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            events: spin::Mutex::new(Vec::new()),
            host_threads: AtomicUsize::new(0),
        }
    }
}

/// Counts one OS thread for as long as it lives
struct HostThread(Arc<Machine>);

impl HostThread {
    fn enter(machine: &Arc<Machine>) -> Self {
        machine.host_threads.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(machine))
    }
}

impl Drop for HostThread {
    fn drop(&mut self) {
        self.0.host_threads.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Unwind payload that ends the OS thread of a retired context
struct Retired;

/// Host backend
///
/// Clones observe the same machine, so a test can keep one to watch for
/// shutdown after handing the other to [`Kernel::boot`](crate::Kernel::boot).
#[derive(Clone, Default)]
pub struct HostArch {
    machine: Arc<Machine>,
}

impl HostArch {
    /// Create a backend for a fresh machine
    pub fn new() -> Self {
        Self::default()
    }

    /// First terminal event recorded, if any
    pub fn shutdown_event(&self) -> Option<MachineEvent> {
        self.machine.events.lock().first().copied()
    }

    /// Wait up to `timeout` for the machine to halt or reboot
    pub fn wait_for_shutdown(&self, timeout: Duration) -> Option<MachineEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.shutdown_event() {
                return Some(event);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(IDLE_NAP);
        }
    }

    /// OS threads backing contexts that are still alive or parked
    pub fn host_threads(&self) -> usize {
        self.machine.host_threads.load(Ordering::SeqCst)
    }

    fn power_off(&self, event: MachineEvent) -> ! {
        info!("host machine {:?}", event);
        self.machine.events.lock().push(event);
        loop {
            thread::park();
        }
    }
}

impl Arch for HostArch {
    type Context = HostContext;

    fn bootstrap_context(&self) -> HostContext {
        HostContext {
            baton: Baton::new(),
        }
    }

    fn init_context(&self, stack: &Stack, start: ThreadStart) -> Result<HostContext> {
        let baton = Baton::new();
        let theirs = Arc::clone(&baton);
        let counted = HostThread::enter(&self.machine);

        thread::Builder::new()
            .name("kthread".into())
            .stack_size(stack.len().max(HOST_MIN_STACK))
            .spawn(move || {
                let _counted = counted;
                // Destroyed before it ever ran.
                if theirs.park() == Turn::Retired {
                    return;
                }
                match panic::catch_unwind(AssertUnwindSafe(start)) {
                    Ok(()) => {}
                    Err(payload) if payload.is::<Retired>() => {}
                    // Peers are parked and could never observe an unwinding
                    // thread, so a panic takes the machine down.
                    Err(_) => {
                        error!("kernel thread panicked");
                        process::abort();
                    }
                }
            })
            .map_err(|_| KernelError::ContextUnavailable)?;

        Ok(HostContext { baton })
    }

    unsafe fn switch_context(&self, prev: *mut HostContext, next: *const HostContext) {
        // Our own context may be freed as soon as `next` runs.
        let own = Arc::clone(unsafe { &(*prev).baton });
        unsafe { &*next }.baton.release();

        if own.park() == Turn::Retired {
            loop {
                thread::park();
            }
        }
    }

    unsafe fn switch_final(&self, prev: *mut HostContext, next: *const HostContext) -> ! {
        let own = Arc::clone(unsafe { &(*prev).baton });
        unsafe { &*next }.baton.release();

        if own.park() != Turn::Retired {
            panic!("finished context was resumed");
        }
        drop(own);
        if cfg!(panic = "unwind") {
            panic::resume_unwind(Box::new(Retired));
        }
        loop {
            thread::park();
        }
    }

    fn wait_for_interrupt(&self) {
        thread::sleep(IDLE_NAP);
    }

    fn halt_forever(&self) -> ! {
        self.power_off(MachineEvent::Halted)
    }

    fn reboot(&self) -> ! {
        self.power_off(MachineEvent::Rebooted)
    }
}
