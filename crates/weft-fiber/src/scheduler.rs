//! FiberScheduler - round-robin owner of fibers on one thread.
//!
//! The scheduler keeps its live fibers in an ordered ready list and drives
//! them with a dispatch loop: resume the fiber at the cursor, remove it if
//! it terminated, otherwise advance the cursor (wrapping at the end).
//! Suspension happens only at explicit yield points, so a fiber that never
//! yields monopolizes the scheduler. That is the contract, not a bug.
//!
//! # Dispatch Loop
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ while ready list non-empty and not stopped:                │
//! │   1. resume ready[pos], catching propagated failures       │
//! │   2. OwnerTerminated  → exit loop cleanly                  │
//! │      other failure    → return Err from start()            │
//! │   3. fiber terminated → remove; wrap pos to 0 past the end │
//! │   4. else             → advance pos (wrapping)             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Newly spawned fibers enter at the tail; after the spawner yields, the
//! dispatcher visits the remaining fibers before looping back to the
//! newcomer. Strict round-robin in insertion order, not FIFO fairness.
//!
//! # Thread Affinity
//!
//! [`Fiber`] is `!Send`, so a scheduler is pinned to the thread that
//! created it; share it within that thread as `Rc<FiberScheduler>`.
//! Cross-thread interaction (a bare thread waking a parked fiber) goes
//! through [`FiberCondition`]'s atomic flag, never through the scheduler
//! itself. Dropping a scheduler reclaims the stacks of any still-live
//! fibers.

use std::cell::{Cell, RefCell};
use tracing::debug;

use crate::condition::FiberCondition;
use crate::error::FiberError;
use crate::fiber::{yield_now, Fiber};

/// Round-robin cooperative scheduler.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use weft_fiber::FiberScheduler;
///
/// let scheduler = Rc::new(FiberScheduler::new());
/// let sum = Rc::new(Cell::new(0));
///
/// let sched = Rc::clone(&scheduler);
/// let total = Rc::clone(&sum);
/// scheduler
///     .start(move || {
///         for n in 1..=3 {
///             let total = Rc::clone(&total);
///             sched.spawn(move || {
///                 total.set(total.get() + n);
///                 Ok(())
///             });
///         }
///         Ok(())
///     })
///     .unwrap();
///
/// assert_eq!(sum.get(), 6);
/// ```
#[derive(Default)]
pub struct FiberScheduler {
    fibers: RefCell<Vec<Fiber>>,
    pos: Cell<usize>,
    dispatching: Cell<bool>,
    terminated: Cell<bool>,
}

impl FiberScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `task` in the first fiber and runs the dispatch loop until it
    /// exits.
    ///
    /// Returns when every fiber has terminated, when [`stop`](Self::stop)
    /// is observed, or when a fiber body signals
    /// [`FiberError::OwnerTerminated`]. Calling `start` while the
    /// scheduler is already dispatching is a no-op returning `Ok(())`.
    ///
    /// # Errors
    ///
    /// Any failure other than the termination signal escaping a fiber body
    /// unwinds the loop and is returned here, leaving the remaining fibers
    /// unresumed in the ready list.
    pub fn start<F>(&self, task: F) -> Result<(), FiberError>
    where
        F: FnOnce() -> Result<(), FiberError> + 'static,
    {
        if self.dispatching.get() {
            return Ok(());
        }
        self.fibers.borrow_mut().push(Fiber::new(task));

        debug!("dispatch loop entered: {} fiber(s)", self.fiber_count());
        self.dispatching.set(true);
        let result = self.dispatch();
        self.dispatching.set(false);
        debug!(
            "dispatch loop exited: {} fiber(s) remaining",
            self.fiber_count()
        );
        result
    }

    /// Appends a fiber for `task` to the ready list, then yields so the
    /// newcomer gets a prompt chance to begin.
    ///
    /// The yield is a no-op when called outside a fiber (e.g. to seed the
    /// list before `start`).
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() -> Result<(), FiberError> + 'static,
    {
        self.fibers.borrow_mut().push(Fiber::new(task));
        yield_now();
    }

    /// [`spawn`](Self::spawn) with an explicit stack size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FiberError::StackAllocation`] when the stack cannot be
    /// mapped; nothing is enqueued in that case.
    pub fn spawn_with_stack_size<F>(&self, task: F, stack_bytes: usize) -> Result<(), FiberError>
    where
        F: FnOnce() -> Result<(), FiberError> + 'static,
    {
        let fiber = Fiber::with_stack_size(task, stack_bytes)?;
        self.fibers.borrow_mut().push(fiber);
        yield_now();
        Ok(())
    }

    /// Requests termination. Monotonic: a stopped scheduler never
    /// dispatches again. The dispatcher observes the flag between
    /// iterations; it does not abort the currently running fiber.
    pub fn stop(&self) {
        self.terminated.set(true);
    }

    /// Constructs a cooperative condition for fibers of this scheduler.
    #[must_use]
    pub fn new_condition(&self) -> FiberCondition {
        FiberCondition::new()
    }

    /// Number of live fibers in the ready list.
    #[must_use]
    pub fn fiber_count(&self) -> usize {
        self.fibers.borrow().len()
    }

    /// Returns `true` while the dispatch loop is running.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.get()
    }

    fn dispatch(&self) -> Result<(), FiberError> {
        loop {
            if self.terminated.get() {
                return Ok(());
            }

            // Take the fiber out of the list while it runs: fiber code is
            // free to spawn into (and thereby reborrow) the same list.
            let mut fiber = {
                let mut fibers = self.fibers.borrow_mut();
                if fibers.is_empty() {
                    return Ok(());
                }
                if self.pos.get() >= fibers.len() {
                    self.pos.set(0);
                }
                fibers.remove(self.pos.get())
            };

            if let Some(failure) = fiber.resume() {
                return match failure {
                    FiberError::OwnerTerminated => {
                        debug!("termination signal observed, exiting dispatch");
                        Ok(())
                    }
                    other => Err(other),
                };
            }

            let mut fibers = self.fibers.borrow_mut();
            let pos = self.pos.get();
            if fiber.is_terminated() {
                // Already out of the list; the cursor now points at the
                // fiber that followed it.
                if pos >= fibers.len() {
                    self.pos.set(0);
                }
            } else {
                fibers.insert(pos, fiber);
                let next = pos + 1;
                self.pos.set(if next >= fibers.len() { 0 } else { next });
            }
        }
    }
}

impl std::fmt::Debug for FiberScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FiberScheduler")
            .field("fibers", &self.fiber_count())
            .field("dispatching", &self.dispatching.get())
            .field("terminated", &self.terminated.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn start_runs_a_single_task() {
        let scheduler = FiberScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let probe = Rc::clone(&ran);
        scheduler
            .start(move || {
                probe.set(true);
                Ok(())
            })
            .unwrap();
        assert!(ran.get());
        assert_eq!(scheduler.fiber_count(), 0);
    }

    #[test]
    fn round_robin_interleaves_in_insertion_order() {
        let scheduler = Rc::new(FiberScheduler::new());
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let sched = Rc::clone(&scheduler);
        let a_log = Rc::clone(&log);
        scheduler
            .start(move || {
                let b_log = Rc::clone(&a_log);
                sched.spawn(move || {
                    b_log.borrow_mut().push("b1");
                    yield_now();
                    b_log.borrow_mut().push("b2");
                    Ok(())
                });
                a_log.borrow_mut().push("a1");
                yield_now();
                a_log.borrow_mut().push("a2");
                yield_now();
                a_log.borrow_mut().push("a3");
                Ok(())
            })
            .unwrap();

        assert_eq!(*log.borrow(), ["b1", "a1", "b2", "a2", "a3"]);
    }

    #[test]
    fn spawned_fibers_run_in_spawn_order() {
        let scheduler = Rc::new(FiberScheduler::new());
        let order: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

        let sched = Rc::clone(&scheduler);
        let log = Rc::clone(&order);
        scheduler
            .start(move || {
                for n in [1, 2, 3] {
                    let log = Rc::clone(&log);
                    sched.spawn(move || {
                        log.borrow_mut().push(n);
                        Ok(())
                    });
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(*order.borrow(), [1, 2, 3]);
    }

    #[test]
    fn stop_is_observed_between_iterations() {
        let scheduler = Rc::new(FiberScheduler::new());
        let spins = Rc::new(Cell::new(0_u32));

        let sched = Rc::clone(&scheduler);
        let counter = Rc::clone(&spins);
        scheduler
            .start(move || {
                let stopper = Rc::clone(&sched);
                sched.spawn(move || {
                    // One yield so the looping fiber gets a turn first.
                    yield_now();
                    stopper.stop();
                    Ok(())
                });
                loop {
                    counter.set(counter.get() + 1);
                    yield_now();
                }
            })
            .unwrap();

        assert!(scheduler.is_terminated());
        // The looping fiber was never aborted mid-step, only unscheduled.
        assert!(spins.get() >= 1);
        assert_eq!(scheduler.fiber_count(), 1);
    }

    #[test]
    fn stopped_scheduler_never_dispatches_again() {
        let scheduler = FiberScheduler::new();
        scheduler.stop();
        let ran = Rc::new(Cell::new(false));
        let probe = Rc::clone(&ran);
        scheduler
            .start(move || {
                probe.set(true);
                Ok(())
            })
            .unwrap();
        assert!(!ran.get());
    }

    #[test]
    fn nested_start_is_a_noop() {
        let scheduler = Rc::new(FiberScheduler::new());
        let inner_ran = Rc::new(Cell::new(false));

        let sched = Rc::clone(&scheduler);
        let probe = Rc::clone(&inner_ran);
        scheduler
            .start(move || {
                let inner_probe = Rc::clone(&probe);
                sched
                    .start(move || {
                        inner_probe.set(true);
                        Ok(())
                    })
                    .unwrap();
                Ok(())
            })
            .unwrap();

        assert!(!inner_ran.get());
        assert!(!scheduler.is_dispatching());
    }

    #[test]
    fn owner_terminated_exits_cleanly() {
        let scheduler = FiberScheduler::new();
        let result = scheduler.start(|| Err(FiberError::OwnerTerminated));
        assert!(result.is_ok());
    }

    #[test]
    fn owner_terminated_leaves_other_fibers_unresumed() {
        let scheduler = Rc::new(FiberScheduler::new());
        let other_progress = Rc::new(Cell::new(0_u32));

        let sched = Rc::clone(&scheduler);
        let counter = Rc::clone(&other_progress);
        scheduler
            .start(move || {
                let counter = Rc::clone(&counter);
                sched.spawn(move || {
                    loop {
                        counter.set(counter.get() + 1);
                        yield_now();
                    }
                });
                Err(FiberError::OwnerTerminated)
            })
            .unwrap();

        // Spawn yielded once into the looping fiber; after the signal the
        // dispatcher never came back to it.
        assert_eq!(other_progress.get(), 1);
        assert_eq!(scheduler.fiber_count(), 1);
    }

    #[test]
    fn task_failure_propagates_to_start() {
        let scheduler = FiberScheduler::new();
        let result = scheduler.start(|| Err(FiberError::Task("bad input".into())));
        match result {
            Err(FiberError::Task(msg)) => assert_eq!(msg, "bad input"),
            other => panic!("expected task failure, got {other:?}"),
        }
    }

    #[test]
    fn panic_in_fiber_propagates_as_error() {
        let scheduler = FiberScheduler::new();
        let result = scheduler.start(|| panic!("fiber blew up"));
        match result {
            Err(FiberError::Panicked(msg)) => assert_eq!(msg, "fiber blew up"),
            other => panic!("expected panic error, got {other:?}"),
        }
    }

    #[test]
    fn condition_factory_produces_working_condition() {
        let scheduler = Rc::new(FiberScheduler::new());
        let cond = Rc::new(scheduler.new_condition());
        let done = Rc::new(Cell::new(false));

        let sched = Rc::clone(&scheduler);
        let wait_cond = Rc::clone(&cond);
        let probe = Rc::clone(&done);
        scheduler
            .start(move || {
                let notify_cond = Rc::clone(&wait_cond);
                sched.spawn(move || {
                    notify_cond.notify();
                    Ok(())
                });
                wait_cond.wait();
                probe.set(true);
                Ok(())
            })
            .unwrap();

        assert!(done.get());
    }

    #[test]
    fn spawn_with_stack_size_runs() {
        let scheduler = Rc::new(FiberScheduler::new());
        let ran = Rc::new(Cell::new(false));

        let sched = Rc::clone(&scheduler);
        let probe = Rc::clone(&ran);
        scheduler
            .start(move || {
                let probe = Rc::clone(&probe);
                sched.spawn_with_stack_size(
                    move || {
                        probe.set(true);
                        Ok(())
                    },
                    128 * 1024,
                )?;
                Ok(())
            })
            .unwrap();

        assert!(ran.get());
    }
}
