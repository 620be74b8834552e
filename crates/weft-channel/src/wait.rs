//! Wait contexts - the records that park one sender or receiver.
//!
//! A [`WaitContext`] lives from its insertion into a channel's waiter
//! queue until the notification that releases its waiter. It carries the
//! value being handed over (the sender's offer, or the receiver's
//! delivery), a `delivered` flag that distinguishes a completed handoff
//! from a close-time drain, and one of two waiter kinds chosen from the
//! caller's context at park time.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use weft_fiber::{context, in_fiber, FiberCondition, ThreadCondition};

/// Parks one channel operation until its peer (or `close`) releases it.
pub(crate) struct WaitContext<T> {
    slot: Mutex<Option<T>>,
    delivered: AtomicBool,
    waiter: Waiter,
}

enum Waiter {
    /// Cooperative waiter: the fiber spin-yields, the host thread stays
    /// live for the scheduler's other fibers.
    Fiber(FiberCondition),
    /// Blocking waiter for bare threads (or fibers without a scheduler in
    /// the context slot).
    Thread(ThreadCondition),
}

impl Waiter {
    fn for_caller() -> Self {
        if in_fiber() && context::current_scheduler().is_some() {
            Self::Fiber(FiberCondition::new())
        } else {
            Self::Thread(ThreadCondition::new())
        }
    }
}

impl<T> WaitContext<T> {
    /// Context for a parked sender carrying its offered value.
    pub(crate) fn sender(value: T) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Some(value)),
            delivered: AtomicBool::new(false),
            waiter: Waiter::for_caller(),
        })
    }

    /// Context for a parked receiver with an empty delivery slot.
    pub(crate) fn receiver() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            delivered: AtomicBool::new(false),
            waiter: Waiter::for_caller(),
        })
    }

    /// Parks the caller until notified. Cooperative contexts yield;
    /// blocking contexts block.
    pub(crate) fn park(&self) {
        match &self.waiter {
            Waiter::Fiber(cond) => cond.wait(),
            Waiter::Thread(cond) => cond.wait(),
        }
    }

    /// Releases the parked waiter. Safe to call from any thread; both
    /// condition kinds latch the notification, so notify-before-park is
    /// not lost.
    pub(crate) fn notify(&self) {
        match &self.waiter {
            Waiter::Fiber(cond) => cond.notify(),
            Waiter::Thread(cond) => cond.notify(),
        }
    }

    /// Takes the carried value out of the slot.
    pub(crate) fn take_value(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// Places a value into the slot (delivery to a parked receiver).
    pub(crate) fn put_value(&self, value: T) {
        *self.slot.lock() = Some(value);
    }

    /// Marks the handoff as completed, as opposed to a close-time drain.
    pub(crate) fn mark_delivered(&self) {
        self.delivered.store(true, Ordering::Release);
    }

    /// Whether the handoff completed before the waiter woke.
    pub(crate) fn was_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }
}
