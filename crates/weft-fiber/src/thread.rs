//! ThreadScheduler - OS threads pre-wired with a fiber scheduler.
//!
//! Worker threads spawned here come up with a fresh
//! [`FiberScheduler`](crate::FiberScheduler) already installed in their
//! [context slot](crate::context), so the task (and any channel operation
//! it performs) can discover the scheduler without threading it through
//! arguments. The slots are cleared when the worker exits, normally or by
//! panic.

use parking_lot::Mutex;
use std::rc::Rc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

use crate::condition::ThreadCondition;
use crate::context;
use crate::scheduler::FiberScheduler;

/// Spawner of scheduler-equipped worker threads.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use weft_fiber::{context, ThreadScheduler};
///
/// let threads = ThreadScheduler::new();
/// let saw_scheduler = Arc::new(AtomicBool::new(false));
///
/// let probe = Arc::clone(&saw_scheduler);
/// threads.spawn(move || {
///     probe.store(context::current_scheduler().is_some(), Ordering::Release);
/// });
/// threads.join();
///
/// assert!(saw_scheduler.load(Ordering::Acquire));
/// ```
#[derive(Default)]
pub struct ThreadScheduler {
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadScheduler {
    /// Creates a scheduler with no workers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` synchronously on the calling thread.
    ///
    /// A trivial shell kept for interface symmetry with
    /// [`FiberScheduler::start`](crate::FiberScheduler::start).
    pub fn start<F, R>(&self, task: F) -> R
    where
        F: FnOnce() -> R,
    {
        task()
    }

    /// Starts a worker thread for `task`.
    ///
    /// The worker installs a fresh [`FiberScheduler`] into its context
    /// slot before running `task` and clears the slots on the way out,
    /// whether `task` returns or panics.
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = std::thread::spawn(move || {
            struct SlotTeardown;
            impl Drop for SlotTeardown {
                fn drop(&mut self) {
                    context::clear();
                }
            }

            let scheduler = Rc::new(FiberScheduler::new());
            context::set_current_scheduler(Some(scheduler));
            let _teardown = SlotTeardown;

            debug!("worker thread started");
            task();
            debug!("worker thread exiting");
        });
        self.workers.lock().push(handle);
    }

    /// Joins every worker spawned so far.
    pub fn join(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }

    /// Constructs a standard OS condition variable.
    ///
    /// Callers that need a cooperative condition must ask a
    /// [`FiberScheduler`] instead.
    #[must_use]
    pub fn new_condition(&self) -> ThreadCondition {
        ThreadCondition::new()
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.join();
    }
}
