//! Per-thread context slots.
//!
//! Each OS thread carries three slots, empty until installed:
//!
//! - the active [`FiberScheduler`], read by channel operations to decide
//!   between cooperative and OS waiting ("bare thread" means the slot is
//!   empty),
//! - a *transceiver* slot and a *waiting manager* slot, reserved for the
//!   request/response layer built on top of this crate. The core never
//!   reads them; it only guarantees slot lifetime = thread lifetime.
//!
//! Installing a handle does not transfer ownership: the installer keeps
//! its own handle and remains responsible for teardown. [`clear`] empties
//! all three slots and is called by
//! [`ThreadScheduler`](crate::ThreadScheduler) when a worker thread exits.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::scheduler::FiberScheduler;

thread_local! {
    static CONTEXT: RefCell<ThreadContext> = RefCell::new(ThreadContext::default());
}

#[derive(Default)]
struct ThreadContext {
    scheduler: Option<Rc<FiberScheduler>>,
    transceiver: Option<Rc<dyn Any>>,
    waiting_manager: Option<Rc<dyn Any>>,
}

/// Returns the scheduler installed in the calling thread's slot.
///
/// `None` means the caller is on a bare thread (or a thread whose
/// scheduler was not installed); channel operations use this to fall back
/// to OS blocking primitives.
#[must_use]
pub fn current_scheduler() -> Option<Rc<FiberScheduler>> {
    CONTEXT.with(|ctx| ctx.borrow().scheduler.clone())
}

/// Installs (or removes, with `None`) the calling thread's scheduler.
pub fn set_current_scheduler(scheduler: Option<Rc<FiberScheduler>>) {
    CONTEXT.with(|ctx| ctx.borrow_mut().scheduler = scheduler);
}

/// Returns the reserved transceiver slot.
#[must_use]
pub fn transceiver() -> Option<Rc<dyn Any>> {
    CONTEXT.with(|ctx| ctx.borrow().transceiver.clone())
}

/// Installs (or removes) the reserved transceiver slot.
pub fn set_transceiver(transceiver: Option<Rc<dyn Any>>) {
    CONTEXT.with(|ctx| ctx.borrow_mut().transceiver = transceiver);
}

/// Returns the reserved waiting-manager slot.
#[must_use]
pub fn waiting_manager() -> Option<Rc<dyn Any>> {
    CONTEXT.with(|ctx| ctx.borrow().waiting_manager.clone())
}

/// Installs (or removes) the reserved waiting-manager slot.
pub fn set_waiting_manager(manager: Option<Rc<dyn Any>>) {
    CONTEXT.with(|ctx| ctx.borrow_mut().waiting_manager = manager);
}

/// Empties every slot on the calling thread.
pub fn clear() {
    CONTEXT.with(|ctx| *ctx.borrow_mut() = ThreadContext::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_empty() {
        std::thread::spawn(|| {
            assert!(current_scheduler().is_none());
            assert!(transceiver().is_none());
            assert!(waiting_manager().is_none());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn scheduler_slot_roundtrip() {
        std::thread::spawn(|| {
            let scheduler = Rc::new(FiberScheduler::new());
            set_current_scheduler(Some(Rc::clone(&scheduler)));
            assert!(current_scheduler().is_some());

            set_current_scheduler(None);
            assert!(current_scheduler().is_none());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn reserved_slots_hold_opaque_values() {
        std::thread::spawn(|| {
            set_transceiver(Some(Rc::new(41_u32)));
            set_waiting_manager(Some(Rc::new("pending".to_owned())));

            let stored = transceiver().unwrap();
            assert_eq!(*stored.downcast::<u32>().unwrap(), 41);
            assert!(waiting_manager().is_some());

            clear();
            assert!(transceiver().is_none());
            assert!(waiting_manager().is_none());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn slots_are_per_thread() {
        std::thread::spawn(|| {
            set_current_scheduler(Some(Rc::new(FiberScheduler::new())));
            std::thread::spawn(|| {
                assert!(current_scheduler().is_none());
            })
            .join()
            .unwrap();
        })
        .join()
        .unwrap();
    }
}
