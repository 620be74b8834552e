//! Condition variable analogs for the two waiting models.
//!
//! | Type | Waiter | Wait strategy |
//! |------|--------|---------------|
//! | [`FiberCondition`] | fiber | spin on [`yield_now`], host thread stays live |
//! | [`ThreadCondition`] | bare thread | block on an OS condition variable |
//!
//! Both expose the same four operations (`wait`, `wait_for`, `notify`,
//! `notify_all`) so channel wait contexts can treat them uniformly. The
//! notifier side is always safe to call from any thread, including a bare
//! thread notifying a fiber, the case that makes cross-thread channels
//! work.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::fiber::yield_now;

/// Cooperative condition: waiting yields instead of blocking.
///
/// The notified flag is a single atomic, which is also what makes the
/// condition sound when the notifier runs on a different OS thread than
/// the waiting fiber.
///
/// # Known Limitation
///
/// `notify_all` is equivalent to `notify`: the flag is a single boolean
/// and the first waiter to observe it consumes it. Waking several fibers
/// blocked on one condition requires one condition per waiter (the channel
/// layer does exactly that).
///
/// # Example
///
/// ```
/// use weft_fiber::FiberCondition;
///
/// let cond = FiberCondition::new();
/// cond.notify();
/// // Already notified, so the wait returns without spinning.
/// cond.wait();
/// ```
#[derive(Debug, Default)]
pub struct FiberCondition {
    notified: AtomicBool,
}

impl FiberCondition {
    /// Creates a condition with the flag unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            notified: AtomicBool::new(false),
        }
    }

    /// Yields until notified, then consumes the notification.
    ///
    /// Never blocks the host thread; other fibers on the same scheduler
    /// keep running while this one waits.
    pub fn wait(&self) {
        while !self.notified.swap(false, Ordering::AcqRel) {
            yield_now();
        }
    }

    /// Like [`wait`](Self::wait) with a deadline.
    ///
    /// Returns `true` when the notification arrived before `timeout`
    /// elapsed. The flag is reset on either exit path.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.notified.swap(false, Ordering::AcqRel) {
                return true;
            }
            if Instant::now() >= deadline {
                self.notified.store(false, Ordering::Release);
                return false;
            }
            yield_now();
        }
    }

    /// Sets the flag and yields once so a waiting fiber gets a prompt
    /// chance to observe it. The yield is a no-op off-fiber.
    pub fn notify(&self) {
        self.notified.store(true, Ordering::Release);
        yield_now();
    }

    /// Equivalent to [`notify`](Self::notify); see the type-level note.
    pub fn notify_all(&self) {
        self.notify();
    }
}

/// OS condition variable with a latched signal.
///
/// Unlike a raw condvar, the signal is sticky: a `notify` that happens
/// before the `wait` is not lost. Channel wakers rely on this; they
/// notify after releasing the channel mutex, possibly before the waiter
/// has parked.
#[derive(Debug, Default)]
pub struct ThreadCondition {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl ThreadCondition {
    /// Creates a condition with the signal unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Blocks the calling thread until notified, then consumes the signal.
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.condvar.wait(&mut signaled);
        }
        *signaled = false;
    }

    /// Like [`wait`](Self::wait) with a deadline; returns `true` when the
    /// signal arrived in time.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self.condvar.wait_until(&mut signaled, deadline).timed_out() {
                break;
            }
        }
        let notified = *signaled;
        *signaled = false;
        notified
    }

    /// Latches the signal and wakes one waiter.
    pub fn notify(&self) {
        *self.signaled.lock() = true;
        self.condvar.notify_one();
    }

    /// Latches the signal and wakes all waiters.
    ///
    /// Only one of them will consume the signal; the rest go back to
    /// waiting. Matches the single-boolean semantics of
    /// [`FiberCondition::notify_all`].
    pub fn notify_all(&self) {
        *self.signaled.lock() = true;
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FiberScheduler;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fiber_condition_latches_notification() {
        let cond = FiberCondition::new();
        cond.notify();
        // Off-fiber wait: the latched flag satisfies it immediately.
        cond.wait();
        // Flag was consumed.
        assert!(!cond.wait_for(Duration::from_millis(5)));
    }

    #[test]
    fn fiber_condition_wait_for_times_out() {
        let cond = FiberCondition::new();
        let started = Instant::now();
        assert!(!cond.wait_for(Duration::from_millis(10)));
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn fiber_condition_synchronizes_two_fibers() {
        let scheduler = Rc::new(FiberScheduler::new());
        let cond = Arc::new(FiberCondition::new());
        let woken = Arc::new(AtomicBool::new(false));

        let sched = Rc::clone(&scheduler);
        let waiter_cond = Arc::clone(&cond);
        let waiter_flag = Arc::clone(&woken);
        scheduler
            .start(move || {
                let notify_cond = Arc::clone(&waiter_cond);
                sched.spawn(move || {
                    notify_cond.notify();
                    Ok(())
                });
                waiter_cond.wait();
                waiter_flag.store(true, Ordering::Release);
                Ok(())
            })
            .unwrap();

        assert!(woken.load(Ordering::Acquire));
    }

    #[test]
    fn thread_condition_wakes_cross_thread() {
        let cond = Arc::new(ThreadCondition::new());
        let waiter = {
            let cond = Arc::clone(&cond);
            thread::spawn(move || cond.wait())
        };
        // Latched semantics make the order irrelevant.
        cond.notify();
        waiter.join().unwrap();
    }

    #[test]
    fn thread_condition_notify_before_wait_is_not_lost() {
        let cond = ThreadCondition::new();
        cond.notify();
        assert!(cond.wait_for(Duration::from_millis(1)));
    }

    #[test]
    fn thread_condition_wait_for_times_out() {
        let cond = ThreadCondition::new();
        assert!(!cond.wait_for(Duration::from_millis(10)));
    }
}
