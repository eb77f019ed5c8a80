// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler Integration Tests
//!
//! Thread lifecycle, queue order and the idle path on real kernels.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::{boot, boot_with, cooperative, entries, journal, record};
use crate::{
    HostArch, Kernel, KernelConfig, KernelError, MachineEvent, Priority, Result, Synchronizer,
    ThreadConfig, ThreadState,
};

/// Boot, spawn one short-lived worker, and retire the main thread
fn run_until_stranded(config: KernelConfig, arch: HostArch) {
    thread::spawn(move || {
        let kernel = Kernel::boot(arch, config).unwrap();
        let _worker = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();
        kernel.exit(0)
    });
}

/// Poll until the backend runs exactly `count` OS threads
fn wait_for_host_threads(arch: &HostArch, count: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while arch.host_threads() != count {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

#[test]
fn test_boot_state() {
    let kernel = boot();
    let main = kernel.main_thread();
    let idle = kernel.idle_thread();

    assert_eq!(kernel.running(), main);
    assert_ne!(main, idle);
    assert_eq!(kernel.state_of(main), Ok(ThreadState::Running));
    assert_eq!(kernel.state_of(idle), Ok(ThreadState::Ready));
    assert_eq!(kernel.priority_of(idle), Ok(Priority::IDLE));

    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.ready, [idle]);
    assert_eq!(snapshot.check(), Ok(()));
}

#[test]
fn test_fifo_within_priority() {
    let kernel = boot();
    let log = journal();

    let a = kernel
        .spawn(ThreadConfig::new(), {
            let log = log.clone();
            move |_| {
                record(&log, 'A');
                0
            }
        })
        .unwrap();
    let b = kernel
        .spawn(ThreadConfig::new(), {
            let log = log.clone();
            move |_| {
                record(&log, 'B');
                0
            }
        })
        .unwrap();

    assert_eq!(kernel.snapshot().ready[..2], [a.id(), b.id()]);
    kernel.yield_now();

    assert_eq!(entries(&log), ['A', 'B']);
    assert_eq!(a.state(), ThreadState::Finishing);
    assert_eq!(b.state(), ThreadState::Finishing);
    assert_eq!(kernel.snapshot().check(), Ok(()));
}

#[test]
fn test_spawn_rejects_small_stack() {
    let kernel = boot();
    let err = kernel
        .spawn(ThreadConfig::new().stack_size(16), |_| 0)
        .unwrap_err();
    assert_eq!(
        err,
        KernelError::StackTooSmall {
            requested: 16,
            minimum: crate::MIN_STACK_SIZE
        }
    );
}

#[test]
fn test_join_fresh_thread() {
    let kernel = boot();
    let log = journal();

    let a = kernel
        .spawn(ThreadConfig::new(), {
            let log = log.clone();
            move |kernel| {
                let b = kernel.spawn(ThreadConfig::new(), |_| 42).unwrap();
                record(&log, b.join());
                0
            }
        })
        .unwrap();

    assert_eq!(a.join(), Ok(0));
    let expected: Result<i32> = Ok(42);
    assert_eq!(entries(&log), [expected]);
    assert_eq!(kernel.running(), kernel.main_thread());
}

#[test]
fn test_join_finished_thread() {
    let kernel = boot();
    let worker = kernel.spawn(ThreadConfig::new(), |_| 7).unwrap();

    kernel.yield_now();
    assert_eq!(worker.state(), ThreadState::Finishing);
    assert_eq!(worker.join(), Ok(7));
    assert_eq!(worker.join(), Ok(7));
}

fn bail_out(kernel: &Kernel<HostArch>, status: i32) -> ! {
    kernel.exit(status)
}

#[test]
fn test_explicit_exit_from_nested_call() {
    let kernel = boot();
    let log = journal();

    let worker = kernel
        .spawn(ThreadConfig::new(), {
            let log = log.clone();
            move |kernel| {
                record(&log, "before");
                bail_out(kernel, -3)
            }
        })
        .unwrap();

    assert_eq!(worker.join(), Ok(-3));
    assert_eq!(entries(&log), ["before"]);
}

#[test]
fn test_join_self_is_rejected() {
    let kernel = boot();
    let main = kernel.running();
    assert_eq!(kernel.join_thread(main), Err(KernelError::JoinSelf(main)));
}

#[test]
fn test_second_joiner_is_rejected() {
    let kernel = boot();
    let log = journal();

    let target = kernel
        .spawn(ThreadConfig::new().suspended(), |_| 9)
        .unwrap();
    let target_id = target.id();
    let joiner = kernel
        .spawn(ThreadConfig::new(), {
            let log = log.clone();
            move |kernel| {
                record(&log, kernel.join_thread(target_id));
                0
            }
        })
        .unwrap();

    kernel.yield_now();
    assert_eq!(joiner.state(), ThreadState::Suspended);
    assert_eq!(
        target.join(),
        Err(KernelError::JoinInProgress {
            target: target_id,
            joiner: joiner.id()
        })
    );

    target.resume().unwrap();
    assert_eq!(joiner.join(), Ok(0));
    let expected: Result<i32> = Ok(9);
    assert_eq!(entries(&log), [expected]);
}

#[test]
fn test_destroy_resumes_joiner() {
    let kernel = boot();
    let log = journal();

    let target = kernel
        .spawn(ThreadConfig::new().suspended(), |_| 1)
        .unwrap();
    let target_id = target.id();
    let joiner = kernel
        .spawn(ThreadConfig::new(), {
            let log = log.clone();
            move |kernel| {
                record(&log, kernel.join_thread(target_id));
                0
            }
        })
        .unwrap();

    kernel.yield_now();
    assert_eq!(joiner.state(), ThreadState::Suspended);

    drop(target);
    assert_eq!(joiner.state(), ThreadState::Ready);
    assert_eq!(kernel.state_of(target_id), Err(KernelError::NoSuchThread(target_id)));

    assert_eq!(joiner.join(), Ok(0));
    let expected: Result<i32> = Err(KernelError::NoSuchThread(target_id));
    assert_eq!(entries(&log), [expected]);
}

#[test]
fn test_destroy_unlinks_from_queues() {
    let kernel = boot();
    let sync = Synchronizer::new(&kernel);
    let queue = sync.queue_id();

    let ready = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();
    let suspended = kernel
        .spawn(ThreadConfig::new().suspended(), |_| 0)
        .unwrap();
    let waiting = kernel
        .spawn(ThreadConfig::new(), move |kernel| {
            let guard = kernel.lock();
            drop(kernel.sleep(guard, queue));
            0
        })
        .unwrap();

    // Let `ready` finish and `waiting` park.
    kernel.yield_now();
    assert_eq!(waiting.state(), ThreadState::Waiting);
    assert_eq!(sync.waiters(), 1);

    let (suspended_id, waiting_id) = (suspended.id(), waiting.id());
    drop(suspended);
    drop(waiting);
    drop(ready);

    let snapshot = kernel.snapshot();
    assert!(snapshot.suspended.is_empty());
    assert!(snapshot.waiting_on(queue).is_empty());
    assert_eq!(snapshot.state_of(suspended_id), None);
    assert_eq!(snapshot.state_of(waiting_id), None);
    assert_eq!(snapshot.check(), Ok(()));
    assert_eq!(sync.waiters(), 0);
}

#[test]
fn test_suspended_start_and_resume() {
    let kernel = boot();
    let log = journal();

    let worker = kernel
        .spawn(ThreadConfig::new().suspended(), {
            let log = log.clone();
            move |_| {
                record(&log, "ran");
                0
            }
        })
        .unwrap();

    kernel.yield_now();
    assert!(entries(&log).is_empty());
    assert_eq!(worker.state(), ThreadState::Suspended);
    assert_eq!(kernel.snapshot().suspended, [worker.id()]);

    worker.resume().unwrap();
    assert_eq!(worker.state(), ThreadState::Ready);
    // Resuming a ready thread changes nothing.
    worker.resume().unwrap();
    assert_eq!(worker.state(), ThreadState::Ready);

    kernel.yield_now();
    assert_eq!(entries(&log), ["ran"]);
}

#[test]
fn test_suspend_self() {
    let kernel = boot();
    let log = journal();

    let worker = kernel
        .spawn(ThreadConfig::new(), {
            let log = log.clone();
            move |kernel| {
                record(&log, 1);
                kernel.suspend_thread(kernel.running()).unwrap();
                record(&log, 2);
                0
            }
        })
        .unwrap();

    kernel.yield_now();
    assert_eq!(entries(&log), [1]);
    assert_eq!(worker.state(), ThreadState::Suspended);
    assert_eq!(kernel.snapshot().check(), Ok(()));

    worker.resume().unwrap();
    assert_eq!(worker.join(), Ok(0));
    assert_eq!(entries(&log), [1, 2]);
}

#[test]
fn test_suspend_ready_thread() {
    let kernel = boot();
    let worker = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();

    worker.suspend().unwrap();
    worker.suspend().unwrap();
    assert_eq!(worker.state(), ThreadState::Suspended);
    assert!(!kernel.snapshot().ready.contains(&worker.id()));

    kernel.yield_now();
    assert_eq!(worker.state(), ThreadState::Suspended);
}

#[test]
fn test_suspend_rejects_finished_and_idle() {
    let kernel = boot();
    let worker = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();
    kernel.yield_now();

    assert_eq!(
        worker.suspend(),
        Err(KernelError::InvalidState {
            thread: worker.id(),
            state: ThreadState::Finishing
        })
    );

    let idle = kernel.idle_thread();
    assert!(kernel.suspend_thread(idle).is_err());
    assert_eq!(kernel.state_of(idle), Ok(ThreadState::Ready));
}

#[test]
fn test_suspend_rejects_waiting_thread() {
    let kernel = boot();
    let sync = Arc::new(Synchronizer::new(&kernel));

    let sleeper = kernel
        .spawn(ThreadConfig::new(), {
            let sync = sync.clone();
            move |_| {
                sync.sleep();
                0
            }
        })
        .unwrap();
    kernel.yield_now();
    assert_eq!(sleeper.state(), ThreadState::Waiting);

    assert_eq!(
        sleeper.suspend(),
        Err(KernelError::InvalidState {
            thread: sleeper.id(),
            state: ThreadState::Waiting
        })
    );
    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.state_of(sleeper.id()), Some(ThreadState::Waiting));
    assert_eq!(snapshot.waiting_on(sync.queue_id()), [sleeper.id()]);
    assert!(snapshot.suspended.is_empty());
    assert_eq!(snapshot.check(), Ok(()));

    sync.wakeup();
    assert_eq!(sleeper.join(), Ok(0));
}

#[test]
fn test_pass_runs_target_first() {
    let kernel = boot();
    let log = journal();

    let spawn = |name: char| {
        let log = log.clone();
        kernel
            .spawn(ThreadConfig::new(), move |_| {
                record(&log, name);
                0
            })
            .unwrap()
    };
    let a = spawn('A');
    let b = spawn('B');

    b.pass().unwrap();
    assert_eq!(entries(&log), ['B', 'A']);

    assert_eq!(kernel.pass_to(kernel.running()), Ok(()));
    assert_eq!(
        a.pass(),
        Err(KernelError::InvalidState {
            thread: a.id(),
            state: ThreadState::Finishing
        })
    );
}

#[test]
fn test_priority_order() {
    let kernel = boot();
    let log = journal();

    let spawn = |name: char, priority: Priority| {
        let log = log.clone();
        kernel
            .spawn(ThreadConfig::new().priority(priority), move |_| {
                record(&log, name);
                0
            })
            .unwrap()
    };
    let low = spawn('L', Priority::LOW);
    let _high = spawn('H', Priority::HIGH);
    let _normal = spawn('N', Priority::NORMAL);

    kernel.yield_now();
    assert_eq!(entries(&log), ['H', 'N']);

    // The main thread outranks `low`, so yielding keeps it running.
    kernel.yield_now();
    assert_eq!(low.state(), ThreadState::Ready);

    assert_eq!(low.join(), Ok(0));
    assert_eq!(entries(&log), ['H', 'N', 'L']);
}

#[test]
fn test_set_priority_requeues() {
    let kernel = boot();
    let log = journal();

    let spawn = |name: char| {
        let log = log.clone();
        kernel
            .spawn(ThreadConfig::new(), move |_| {
                record(&log, name);
                0
            })
            .unwrap()
    };
    let _a = spawn('A');
    let b = spawn('B');

    b.set_priority(Priority::HIGH).unwrap();
    assert_eq!(b.priority(), Priority::HIGH);
    assert_eq!(kernel.snapshot().ready[0], b.id());

    kernel.yield_now();
    assert_eq!(entries(&log), ['B', 'A']);
}

#[test]
fn test_ranks_past_idle_still_run() {
    let kernel = boot();

    let far = kernel
        .spawn(ThreadConfig::new().priority(Priority(100)), |_| 5)
        .unwrap();
    assert_eq!(far.priority(), Priority(100));
    assert_eq!(far.join(), Ok(5));

    let clamped = kernel
        .spawn(ThreadConfig::new().priority(Priority::IDLE), |_| 6)
        .unwrap();
    assert_eq!(clamped.priority(), Priority::LOWEST);
    let idle = kernel.idle_thread();
    assert_eq!(kernel.snapshot().ready, [clamped.id(), idle]);
    assert_eq!(clamped.join(), Ok(6));

    let worker = kernel.spawn(ThreadConfig::new(), |_| 7).unwrap();
    worker.set_priority(Priority(i32::MAX)).unwrap();
    assert_eq!(worker.priority(), Priority::LOWEST);
    assert_eq!(worker.join(), Ok(7));

    assert_eq!(
        kernel.set_priority(idle, Priority::HIGH),
        Err(KernelError::InvalidState {
            thread: idle,
            state: ThreadState::Ready
        })
    );
    assert_eq!(kernel.priority_of(idle), Ok(Priority::IDLE));
}

#[test]
fn test_cooperative_tick_does_nothing() {
    let kernel = boot();
    let worker = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();

    kernel.tick();
    assert_eq!(worker.state(), ThreadState::Ready);
    assert_eq!(kernel.running(), kernel.main_thread());
}

#[test]
fn test_preemptive_tick_reschedules() {
    let kernel = boot_with(cooperative().preemptive(true));
    let sync = Synchronizer::new(&kernel);
    let worker = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();

    // The interrupted code holds the kernel lock.
    let guard = sync.begin_atomic();
    kernel.tick();
    sync.end_atomic(guard);
    assert_eq!(worker.state(), ThreadState::Ready);

    kernel.tick();
    assert_eq!(worker.state(), ThreadState::Finishing);
}

#[test]
fn test_preemptive_wakeup_runs_woken_thread() {
    for preemptive in [false, true] {
        let kernel = boot_with(cooperative().preemptive(preemptive));
        let sync = Arc::new(Synchronizer::new(&kernel));
        let log = journal();

        let sleeper = kernel
            .spawn(ThreadConfig::new(), {
                let (sync, log) = (sync.clone(), log.clone());
                move |_| {
                    sync.sleep();
                    record(&log, "woken");
                    0
                }
            })
            .unwrap();

        kernel.yield_now();
        assert_eq!(sleeper.state(), ThreadState::Waiting);

        record(&log, "before");
        sync.wakeup();
        record(&log, "after");
        kernel.yield_now();

        if preemptive {
            assert_eq!(entries(&log), ["before", "woken", "after"]);
        } else {
            assert_eq!(entries(&log), ["before", "after", "woken"]);
        }
    }
}

#[test]
fn test_preemptive_wakeup_reschedules_without_sleepers() {
    let kernel = boot_with(cooperative().preemptive(true));
    let sync = Synchronizer::new(&kernel);

    let first = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();
    sync.wakeup();
    assert_eq!(first.state(), ThreadState::Finishing);

    let second = kernel.spawn(ThreadConfig::new(), |_| 0).unwrap();
    sync.wakeup_all();
    assert_eq!(second.state(), ThreadState::Finishing);
    assert_eq!(kernel.running(), kernel.main_thread());
}

#[test]
fn test_finished_thread_releases_host_thread() {
    let arch = HostArch::new();
    let kernel = Kernel::boot(arch.clone(), cooperative()).unwrap();
    // The idle thread.
    assert_eq!(arch.host_threads(), 1);

    let worker = kernel.spawn(ThreadConfig::new(), |_| 3).unwrap();
    assert_eq!(arch.host_threads(), 2);
    assert_eq!(worker.join(), Ok(3));
    drop(worker);
    assert!(wait_for_host_threads(&arch, 1));

    let never_run = kernel
        .spawn(ThreadConfig::new().suspended(), |_| 0)
        .unwrap();
    assert_eq!(arch.host_threads(), 2);
    drop(never_run);
    assert!(wait_for_host_threads(&arch, 1));
}

#[test]
fn test_idle_halts_when_stranded() {
    let arch = HostArch::new();
    run_until_stranded(cooperative(), arch.clone());
    assert_eq!(
        arch.wait_for_shutdown(Duration::from_secs(10)),
        Some(MachineEvent::Halted)
    );
}

#[test]
fn test_idle_reboots_when_configured() {
    let arch = HostArch::new();
    run_until_stranded(cooperative().reboot(true), arch.clone());
    assert_eq!(
        arch.wait_for_shutdown(Duration::from_secs(10)),
        Some(MachineEvent::Rebooted)
    );
}

#[test]
fn test_idle_waits_for_suspended_thread() {
    let arch = HostArch::new();
    let machine = arch.clone();
    thread::spawn(move || {
        let kernel = Kernel::boot(arch, cooperative()).unwrap();
        let _parked = kernel
            .spawn(ThreadConfig::new().suspended(), |_| 0)
            .unwrap();
        kernel.exit(0)
    });
    assert_eq!(machine.wait_for_shutdown(Duration::from_millis(50)), None);
}
