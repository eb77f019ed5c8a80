// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler implementation
//!
//! Priority scheduling with FIFO order among equal priorities, cooperative
//! by default and optionally preemptive.
//!
//! # Locking
//!
//! All scheduler state sits behind one [`SpinLock`]. An operation takes the
//! lock, mutates thread states and queues, and, when another thread must run,
//! moves its guard into [`Kernel::dispatch`]. The guard comes back only when
//! the calling thread is scheduled again; by then it stands for the lock
//! taken by whichever thread switched back, and dropping it releases that
//! acquisition. A thread that runs for the first time adopts the guard of the
//! thread that dispatched it.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, trace, warn};

use super::state::{Link, Priority, ThreadQueue, ThreadState, WaitQueueId};
use super::thread::{StartState, Stack, Tcb, Thread, ThreadConfig, ThreadId};
use crate::config::{KernelConfig, MIN_STACK_SIZE};
use crate::error::{KernelError, Result};
use crate::sync::{SpinLock, SpinLockGuard};
use crate::traits::{Arch, ThreadStart};

/// Proof that the kernel lock is held
pub type KernelGuard<'a, A> = SpinLockGuard<'a, SchedState<A>>;

/// Scheduler state of one kernel
///
/// Only reachable through a [`KernelGuard`].
pub struct SchedState<A: Arch> {
    /// Thread arena
    threads: BTreeMap<ThreadId, Tcb<A::Context>>,
    /// The thread that owns the processor
    running: ThreadId,
    main: ThreadId,
    idle: ThreadId,
    ready: ThreadQueue,
    suspended: ThreadQueue,
    /// One waiting queue per live synchronizer
    wait_queues: BTreeMap<WaitQueueId, ThreadQueue>,
    next_queue_id: u64,
}

impl<A: Arch> SchedState<A> {
    fn tcb(&self, id: ThreadId) -> Result<&Tcb<A::Context>> {
        self.threads.get(&id).ok_or(KernelError::NoSuchThread(id))
    }

    fn tcb_mut(&mut self, id: ThreadId) -> Result<&mut Tcb<A::Context>> {
        self.threads.get_mut(&id).ok_or(KernelError::NoSuchThread(id))
    }

    /// Control block of a thread the kernel itself is tracking
    fn live(&mut self, id: ThreadId) -> &mut Tcb<A::Context> {
        let Some(tcb) = self.threads.get_mut(&id) else {
            panic!("thread {} vanished while scheduled", id);
        };
        tcb
    }

    /// The running thread
    pub fn running(&self) -> ThreadId {
        self.running
    }

    pub(crate) fn enqueue_ready(&mut self, id: ThreadId) {
        let tcb = self.live(id);
        tcb.state = ThreadState::Ready;
        tcb.link = Link::Ready;
        let priority = tcb.priority;
        self.ready.insert(id, priority);
    }

    pub(crate) fn enqueue_suspended(&mut self, id: ThreadId) {
        let tcb = self.live(id);
        tcb.state = ThreadState::Suspended;
        tcb.link = Link::Suspended;
        let priority = tcb.priority;
        self.suspended.insert(id, priority);
    }

    pub(crate) fn enqueue_waiting(&mut self, id: ThreadId, queue: WaitQueueId) {
        let tcb = self.live(id);
        tcb.state = ThreadState::Waiting;
        tcb.link = Link::Waiting(queue);
        let priority = tcb.priority;
        let Some(waiting) = self.wait_queues.get_mut(&queue) else {
            panic!("sleeping on retired wait queue {}", queue);
        };
        waiting.insert(id, priority);
    }

    /// Take a thread out of whichever queue holds it
    pub(crate) fn unlink(&mut self, id: ThreadId) {
        let tcb = self.live(id);
        let link = core::mem::replace(&mut tcb.link, Link::None);
        match link {
            Link::None => {}
            Link::Ready => {
                self.ready.remove(id);
            }
            Link::Suspended => {
                self.suspended.remove(id);
            }
            Link::Waiting(queue) => {
                if let Some(waiting) = self.wait_queues.get_mut(&queue) {
                    waiting.remove(id);
                }
            }
        }
    }

    /// Make `id` the running thread; the caller dispatches to it
    pub(crate) fn promote(&mut self, id: ThreadId) {
        self.unlink(id);
        self.live(id).state = ThreadState::Running;
        self.running = id;
    }

    /// Promote the head of the ready queue
    pub(crate) fn promote_next(&mut self) -> ThreadId {
        let Some(next) = self.ready.head() else {
            panic!("ready queue empty at dispatch");
        };
        self.promote(next);
        next
    }

    /// Move a suspended thread to the ready queue; other states are left alone
    pub(crate) fn resume_locked(&mut self, id: ThreadId) -> bool {
        match self.threads.get(&id) {
            Some(tcb) if tcb.state == ThreadState::Suspended => {
                self.unlink(id);
                self.enqueue_ready(id);
                true
            }
            _ => false,
        }
    }

    /// Move the head of a waiting queue to the ready queue
    pub(crate) fn wake_one(&mut self, queue: WaitQueueId) -> Option<ThreadId> {
        let id = self.wait_queues.get_mut(&queue)?.remove_head()?;
        self.live(id).link = Link::None;
        self.enqueue_ready(id);
        Some(id)
    }

    pub(crate) fn create_wait_queue(&mut self) -> WaitQueueId {
        let id = WaitQueueId(self.next_queue_id);
        self.next_queue_id += 1;
        self.wait_queues.insert(id, ThreadQueue::new());
        id
    }

    pub(crate) fn remove_wait_queue(&mut self, queue: WaitQueueId) -> Option<ThreadQueue> {
        self.wait_queues.remove(&queue)
    }

    /// Number of threads parked in a waiting queue
    pub(crate) fn waiters(&self, queue: WaitQueueId) -> usize {
        self.wait_queues.get(&queue).map_or(0, ThreadQueue::len)
    }

    /// Check if any synchronizer has a sleeper
    pub(crate) fn has_sleepers(&self) -> bool {
        self.wait_queues.values().any(|queue| !queue.is_empty())
    }

    /// Re-place a thread in its queue after a priority change
    fn requeue(&mut self, id: ThreadId) {
        let tcb = self.live(id);
        let (link, priority) = (tcb.link, tcb.priority);
        let queue = match link {
            Link::None => return,
            Link::Ready => &mut self.ready,
            Link::Suspended => &mut self.suspended,
            Link::Waiting(queue) => match self.wait_queues.get_mut(&queue) {
                Some(waiting) => waiting,
                None => return,
            },
        };
        if queue.remove(id) {
            queue.insert(id, priority);
        }
    }

    fn context_ptr(&mut self, id: ThreadId) -> *mut A::Context {
        &mut *self.live(id).context
    }

    fn snapshot(&self) -> SchedSnapshot {
        SchedSnapshot {
            running: self.running,
            ready: self.ready.iter().collect(),
            suspended: self.suspended.iter().collect(),
            waiting: self
                .wait_queues
                .iter()
                .map(|(id, queue)| (*id, queue.iter().collect()))
                .collect(),
            threads: self
                .threads
                .values()
                .map(|tcb| (tcb.id, tcb.state))
                .collect(),
        }
    }
}

struct KernelInner<A: Arch> {
    arch: A,
    config: KernelConfig,
    state: SpinLock<SchedState<A>>,
    next_id: AtomicU64,
}

/// Handle to one kernel instance
///
/// Cheap to clone; every thread's entry receives one.
pub struct Kernel<A: Arch> {
    inner: Arc<KernelInner<A>>,
}

impl<A: Arch> Clone for Kernel<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Arch> Kernel<A> {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Boot a kernel on the calling execution context
    ///
    /// The caller becomes the main thread, already running. The idle thread
    /// is created ready at [`Priority::IDLE`].
    ///
    /// # Returns
    /// * `Ok(kernel)` - Kernel booted
    /// * `Err(KernelError)` - The idle thread could not be created
    pub fn boot(arch: A, config: KernelConfig) -> Result<Self> {
        let main = ThreadId::new(1);
        let bootstrap = arch.bootstrap_context();
        let main_tcb = Tcb::new(
            main,
            ThreadState::Running,
            Priority::NORMAL,
            Stack::new(config.default_stack_size.max(MIN_STACK_SIZE)),
            bootstrap,
        );

        let mut threads = BTreeMap::new();
        threads.insert(main, main_tcb);

        let kernel = Self {
            inner: Arc::new(KernelInner {
                arch,
                config,
                state: SpinLock::new(SchedState {
                    threads,
                    running: main,
                    main,
                    idle: main,
                    ready: ThreadQueue::new(),
                    suspended: ThreadQueue::new(),
                    wait_queues: BTreeMap::new(),
                    next_queue_id: 0,
                }),
                next_id: AtomicU64::new(main.as_u64() + 1),
            }),
        };

        let idle = kernel.create(
            ThreadConfig::new().priority(Priority::IDLE),
            |kernel: &Kernel<A>| -> i32 { kernel.idle() },
        )?;
        kernel.lock().idle = idle;

        info!(
            "kernel booted: main {}, idle {}, preemptive={}",
            main, idle, config.preemptive
        );
        Ok(kernel)
    }

    /// Create a thread running `entry`
    ///
    /// The thread is queued ready or suspended as `config` asks; the caller
    /// keeps running. The value returned by `entry` is the thread's exit
    /// status. A priority at or past [`Priority::IDLE`] is clamped to
    /// [`Priority::LOWEST`].
    ///
    /// # Returns
    /// * `Ok(thread)` - Owning handle; dropping it destroys the thread
    /// * `Err(KernelError::StackTooSmall)` - Requested stack below [`MIN_STACK_SIZE`]
    /// * `Err(KernelError::ContextUnavailable)` - The arch could not provide a context
    pub fn spawn<F>(&self, mut config: ThreadConfig, entry: F) -> Result<Thread<A>>
    where
        F: FnOnce(&Kernel<A>) -> i32 + Send + 'static,
    {
        config.priority = config.priority.for_thread();
        let id = self.create(config, entry)?;
        Ok(Thread::new(self.clone(), id))
    }

    fn create<F>(&self, config: ThreadConfig, entry: F) -> Result<ThreadId>
    where
        F: FnOnce(&Kernel<A>) -> i32 + Send + 'static,
    {
        let size = config
            .stack_size
            .unwrap_or(self.inner.config.default_stack_size);
        if size < MIN_STACK_SIZE {
            return Err(KernelError::StackTooSmall {
                requested: size,
                minimum: MIN_STACK_SIZE,
            });
        }

        let stack = Stack::new(size);
        let id = ThreadId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let kernel = self.clone();
        let start: ThreadStart = Box::new(move || {
            // Held on our behalf by the thread that dispatched us.
            drop(unsafe { kernel.inner.state.adopt() });
            let status = entry(&kernel);
            kernel.finish(status)
        });
        let context = self.inner.arch.init_context(&stack, start)?;

        let mut guard = self.lock();
        let state = match config.start {
            StartState::Ready => ThreadState::Ready,
            StartState::Suspended => ThreadState::Suspended,
        };
        guard
            .threads
            .insert(id, Tcb::new(id, state, config.priority, stack, context));
        match config.start {
            StartState::Ready => guard.enqueue_ready(id),
            StartState::Suspended => guard.enqueue_suspended(id),
        }
        trace!("spawn {} {:?} at {:?}", id, state, config.priority);
        Ok(id)
    }

    /// Destroy a thread
    ///
    /// Unlinks it from every queue, resumes its joiner and frees its stack
    /// and context once the lock is released.
    ///
    /// # Panics
    ///
    /// If the thread is running.
    pub(crate) fn destroy(&self, id: ThreadId) {
        let mut guard = self.lock();
        let Some(tcb) = guard.threads.get(&id) else {
            return;
        };
        assert!(
            tcb.state != ThreadState::Running,
            "destroying running thread {}",
            id
        );
        trace!("destroy {} {:?}", id, tcb.state);

        guard.unlink(id);
        if let Some(joiner) = guard.live(id).join_waiter.take() {
            guard.resume_locked(joiner);
        }
        // A thread destroyed mid-join no longer waits on its target.
        for other in guard.threads.values_mut() {
            if other.join_waiter == Some(id) {
                other.join_waiter = None;
            }
        }
        let tcb = guard.threads.remove(&id);
        drop(guard);
        drop(tcb);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Acquire the kernel lock
    pub(crate) fn lock(&self) -> KernelGuard<'_, A> {
        self.inner.state.lock()
    }

    /// Switch from `prev` to `next`, which the caller already made running
    ///
    /// Returns once `prev` runs again.
    fn dispatch<'a>(
        &self,
        mut guard: KernelGuard<'a, A>,
        prev: ThreadId,
        next: ThreadId,
    ) -> KernelGuard<'a, A> {
        if prev == next {
            return guard;
        }
        debug!("dispatch {} -> {}", prev, next);
        let prev_ctx = guard.context_ptr(prev);
        let next_ctx = guard.context_ptr(next);
        // Contexts are boxed; their addresses survive arena changes made
        // by other threads while this one is switched out.
        unsafe { self.inner.arch.switch_context(prev_ctx, next_ctx) };
        guard
    }

    fn yield_locked<'a>(&self, mut guard: KernelGuard<'a, A>) -> KernelGuard<'a, A> {
        let prev = guard.running;
        guard.enqueue_ready(prev);
        let next = guard.promote_next();
        self.dispatch(guard, prev, next)
    }

    // ========================================================================
    // Scheduling operations on the running thread
    // ========================================================================

    /// Give up the processor to the best ready thread
    ///
    /// The caller is queued behind every ready thread of equal or better
    /// priority.
    pub fn yield_now(&self) {
        let guard = self.lock();
        trace!("yield {}", guard.running);
        drop(self.yield_locked(guard));
    }

    /// Let the scheduler pick the running thread again
    pub fn reschedule(&self) {
        self.yield_now();
    }

    /// Timer interrupt entry
    ///
    /// In preemptive mode the running thread is rescheduled, unless the code
    /// that was interrupted holds the kernel lock. Does nothing in
    /// cooperative mode.
    pub fn tick(&self) {
        if !self.inner.config.preemptive {
            return;
        }
        let Some(guard) = self.inner.state.try_lock() else {
            trace!("tick while the kernel lock is held");
            return;
        };
        trace!("tick preempts {}", guard.running);
        drop(self.yield_locked(guard));
    }

    /// Finish the running thread with `status`
    ///
    /// Resumes its joiner and never returns. The control block stays until
    /// the thread is destroyed.
    pub fn exit(&self, status: i32) -> ! {
        let (guard, me, next) = self.retire_running(status);
        let _guard = self.dispatch(guard, me, next);
        panic!("finished thread {} was dispatched again", me);
    }

    /// Exit taken when a thread's entry returns
    ///
    /// No caller frames sit above the start closure, so the arch may tear
    /// the thread down once its context is dropped.
    fn finish(&self, status: i32) -> ! {
        let (mut guard, me, next) = self.retire_running(status);
        debug!("dispatch {} -> {} (final)", me, next);
        let prev_ctx = guard.context_ptr(me);
        let next_ctx = guard.context_ptr(next);
        // From here on the lock is held on behalf of `next`.
        core::mem::forget(guard);
        unsafe { self.inner.arch.switch_final(prev_ctx, next_ctx) }
    }

    /// Mark the running thread finishing and pick its successor
    fn retire_running(&self, status: i32) -> (KernelGuard<'_, A>, ThreadId, ThreadId) {
        let mut guard = self.lock();
        let me = guard.running;
        trace!("exit {} status {}", me, status);

        if let Some(joiner) = guard.live(me).join_waiter.take() {
            guard.resume_locked(joiner);
        }
        let tcb = guard.live(me);
        tcb.state = ThreadState::Finishing;
        tcb.link = Link::None;
        tcb.stack.set_exit_status(status);

        let next = guard.promote_next();
        (guard, me, next)
    }

    /// Body of the idle thread
    ///
    /// Hands the processor to any ready thread. When nothing is ready,
    /// suspended or waiting, no thread can ever run again and the machine
    /// is halted or rebooted.
    pub fn idle(&self) -> ! {
        loop {
            let guard = self.lock();
            if !guard.ready.is_empty() {
                drop(self.yield_locked(guard));
                continue;
            }

            if guard.suspended.is_empty() && !guard.has_sleepers() {
                drop(guard);
                warn!("no thread can run again");
                if self.inner.config.reboot {
                    info!("rebooting");
                    self.inner.arch.reboot();
                }
                info!("halting");
                self.inner.arch.halt_forever();
            }

            drop(guard);
            self.inner.arch.wait_for_interrupt();
        }
    }

    // ========================================================================
    // Operations on a thread by id
    // ========================================================================

    /// Move a thread to the suspended queue
    ///
    /// A running thread switches to the head of the ready queue at once.
    /// Suspending a suspended thread does nothing.
    ///
    /// # Returns
    /// * `Ok(())` - Thread is suspended
    /// * `Err(KernelError::InvalidState)` - Thread is waiting, finishing, or the idle thread
    /// * `Err(KernelError::NoSuchThread)` - Unknown id
    pub fn suspend_thread(&self, id: ThreadId) -> Result<()> {
        let mut guard = self.lock();
        let state = guard.tcb(id)?.state;
        trace!("suspend {} {:?}", id, state);

        if id == guard.idle {
            return Err(KernelError::InvalidState { thread: id, state });
        }
        match state {
            ThreadState::Suspended => Ok(()),
            ThreadState::Waiting | ThreadState::Finishing => {
                Err(KernelError::InvalidState { thread: id, state })
            }
            ThreadState::Ready => {
                guard.unlink(id);
                guard.enqueue_suspended(id);
                Ok(())
            }
            ThreadState::Running => {
                guard.enqueue_suspended(id);
                let next = guard.promote_next();
                drop(self.dispatch(guard, id, next));
                Ok(())
            }
        }
    }

    /// Move a suspended thread to the ready queue
    ///
    /// Does nothing for a thread in any other state. Never switches.
    pub fn resume_thread(&self, id: ThreadId) -> Result<()> {
        let mut guard = self.lock();
        guard.tcb(id)?;
        let resumed = guard.resume_locked(id);
        trace!("resume {} resumed={}", id, resumed);
        Ok(())
    }

    /// Hand the processor directly to a ready thread
    ///
    /// # Returns
    /// * `Ok(())` - Once the caller runs again; immediately if `id` is the caller
    /// * `Err(KernelError::InvalidState)` - Target is not ready
    /// * `Err(KernelError::NoSuchThread)` - Unknown id
    pub fn pass_to(&self, id: ThreadId) -> Result<()> {
        let mut guard = self.lock();
        let prev = guard.running;
        trace!("pass {} -> {}", prev, id);
        if id == prev {
            return Ok(());
        }

        let state = guard.tcb(id)?.state;
        if state != ThreadState::Ready {
            return Err(KernelError::InvalidState { thread: id, state });
        }
        guard.enqueue_ready(prev);
        guard.promote(id);
        drop(self.dispatch(guard, prev, id));
        Ok(())
    }

    /// Block until a thread finishes and return its exit status
    ///
    /// # Returns
    /// * `Ok(status)` - The value the thread exited with
    /// * `Err(KernelError::JoinSelf)` - `id` is the caller
    /// * `Err(KernelError::JoinInProgress)` - Another thread is already joining
    /// * `Err(KernelError::NoSuchThread)` - Unknown id, or destroyed while waiting
    pub fn join_thread(&self, id: ThreadId) -> Result<i32> {
        let mut guard = self.lock();
        let me = guard.running;
        trace!("join {} on {}", me, id);
        if id == me {
            return Err(KernelError::JoinSelf(me));
        }

        loop {
            let target = guard.tcb_mut(id)?;
            if target.state == ThreadState::Finishing {
                return Ok(target.stack.exit_status());
            }
            match target.join_waiter {
                Some(joiner) if joiner != me => {
                    return Err(KernelError::JoinInProgress { target: id, joiner });
                }
                _ => target.join_waiter = Some(me),
            }

            guard.enqueue_suspended(me);
            let next = guard.promote_next();
            guard = self.dispatch(guard, me, next);
        }
    }

    /// Change a thread's priority and re-place it in its queue
    ///
    /// The rank is clamped to [`Priority::LOWEST`] so that the idle thread
    /// stays behind everyone.
    ///
    /// # Returns
    /// * `Ok(())` - Priority changed
    /// * `Err(KernelError::InvalidState)` - Target is the idle thread
    /// * `Err(KernelError::NoSuchThread)` - Unknown id
    pub fn set_priority(&self, id: ThreadId, priority: Priority) -> Result<()> {
        let mut guard = self.lock();
        let state = guard.tcb(id)?.state;
        if id == guard.idle {
            return Err(KernelError::InvalidState { thread: id, state });
        }
        let priority = priority.for_thread();
        guard.live(id).priority = priority;
        guard.requeue(id);
        trace!("priority {} = {:?}", id, priority);
        Ok(())
    }

    // ========================================================================
    // Blocking on wait queues
    // ========================================================================

    /// Park the running thread on `queue` and switch away
    ///
    /// Returns with the lock held once the thread has been woken and
    /// scheduled again.
    pub(crate) fn sleep<'a>(
        &self,
        mut guard: KernelGuard<'a, A>,
        queue: WaitQueueId,
    ) -> KernelGuard<'a, A> {
        assert!(self.inner.state.is_locked(), "sleep without the kernel lock");
        let me = guard.running;
        trace!("sleep {} on {}", me, queue);
        guard.enqueue_waiting(me, queue);
        let next = guard.promote_next();
        self.dispatch(guard, me, next)
    }

    /// Ready the first sleeper of `queue` and release the lock
    ///
    /// In preemptive mode the caller is rescheduled afterwards, whether or
    /// not anybody was waiting.
    pub(crate) fn wakeup(&self, mut guard: KernelGuard<'_, A>, queue: WaitQueueId) {
        let woken = guard.wake_one(queue);
        trace!("wakeup {} -> {:?}", queue, woken);
        drop(guard);
        if self.inner.config.preemptive {
            self.reschedule();
        }
    }

    /// Ready every sleeper of `queue` and release the lock
    pub(crate) fn wakeup_all(&self, mut guard: KernelGuard<'_, A>, queue: WaitQueueId) {
        let mut woken = 0usize;
        while guard.wake_one(queue).is_some() {
            woken += 1;
        }
        trace!("wakeup_all {} woke {}", queue, woken);
        drop(guard);
        if self.inner.config.preemptive {
            self.reschedule();
        }
    }

    pub(crate) fn create_wait_queue(&self) -> WaitQueueId {
        self.lock().create_wait_queue()
    }

    /// Ready every sleeper of `queue`, then drop the queue
    pub(crate) fn retire_wait_queue(&self, queue: WaitQueueId) {
        let mut guard = self.lock();
        let mut woken = 0usize;
        while guard.wake_one(queue).is_some() {
            woken += 1;
        }
        guard.remove_wait_queue(queue);
        trace!("retire {} woke {}", queue, woken);
        drop(guard);
        if self.inner.config.preemptive {
            self.reschedule();
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The running thread
    pub fn running(&self) -> ThreadId {
        self.lock().running
    }

    /// The thread that booted the kernel
    pub fn main_thread(&self) -> ThreadId {
        self.lock().main
    }

    /// The idle thread
    pub fn idle_thread(&self) -> ThreadId {
        self.lock().idle
    }

    /// State of a thread
    pub fn state_of(&self, id: ThreadId) -> Result<ThreadState> {
        Ok(self.lock().tcb(id)?.state)
    }

    /// Priority of a thread
    pub fn priority_of(&self, id: ThreadId) -> Result<Priority> {
        Ok(self.lock().tcb(id)?.priority)
    }

    pub(crate) fn expect_state(&self, id: ThreadId) -> ThreadState {
        match self.state_of(id) {
            Ok(state) => state,
            Err(err) => panic!("{}", err),
        }
    }

    pub(crate) fn expect_priority(&self, id: ThreadId) -> Priority {
        match self.priority_of(id) {
            Ok(priority) => priority,
            Err(err) => panic!("{}", err),
        }
    }

    /// Kernel configuration
    pub fn config(&self) -> KernelConfig {
        self.inner.config
    }

    /// Architecture backend
    pub fn arch(&self) -> &A {
        &self.inner.arch
    }

    /// Check if both handles refer to the same kernel
    pub fn ptr_eq(&self, other: &Kernel<A>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copy of the scheduler state taken under the lock
    pub fn snapshot(&self) -> SchedSnapshot {
        self.lock().snapshot()
    }
}

// ============================================================================
// Inspection
// ============================================================================

/// Scheduler state at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedSnapshot {
    pub running: ThreadId,
    /// Ready queue, head first
    pub ready: Vec<ThreadId>,
    /// Suspended queue, head first
    pub suspended: Vec<ThreadId>,
    /// Every waiting queue, each head first
    pub waiting: Vec<(WaitQueueId, Vec<ThreadId>)>,
    /// Every thread and its state
    pub threads: Vec<(ThreadId, ThreadState)>,
}

impl SchedSnapshot {
    /// State of a thread
    pub fn state_of(&self, id: ThreadId) -> Option<ThreadState> {
        self.threads
            .iter()
            .find(|(thread, _)| *thread == id)
            .map(|(_, state)| *state)
    }

    /// Waiting queue contents
    pub fn waiting_on(&self, queue: WaitQueueId) -> &[ThreadId] {
        self.waiting
            .iter()
            .find(|(id, _)| *id == queue)
            .map(|(_, threads)| threads.as_slice())
            .unwrap_or(&[])
    }

    /// Verify queue membership against thread states
    pub fn check(&self) -> core::result::Result<(), &'static str> {
        let running: Vec<_> = self
            .threads
            .iter()
            .filter(|(_, state)| *state == ThreadState::Running)
            .collect();
        if running.len() != 1 {
            return Err("there must be exactly one running thread");
        }
        if running[0].0 != self.running {
            return Err("running thread does not match the recorded one");
        }

        let mut seen: Vec<ThreadId> = Vec::new();
        let queues = [
            (self.ready.as_slice(), ThreadState::Ready),
            (self.suspended.as_slice(), ThreadState::Suspended),
        ];
        let waiting = self
            .waiting
            .iter()
            .map(|(_, threads)| (threads.as_slice(), ThreadState::Waiting));

        for (queue, expected) in queues.into_iter().chain(waiting) {
            for id in queue {
                if seen.contains(id) {
                    return Err("thread linked into more than one queue");
                }
                seen.push(*id);
                if self.state_of(*id) != Some(expected) {
                    return Err("queued thread state does not match its queue");
                }
            }
        }

        for (id, state) in &self.threads {
            let queued = seen.contains(id);
            let should_be_queued = matches!(
                state,
                ThreadState::Ready | ThreadState::Suspended | ThreadState::Waiting
            );
            if queued != should_be_queued {
                return Err("thread state does not match its queue membership");
            }
        }
        Ok(())
    }
}
