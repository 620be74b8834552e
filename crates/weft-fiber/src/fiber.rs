//! Fiber - stackful cooperative task.
//!
//! A [`Fiber`] wraps a stackful coroutine: it runs on its own stack, can
//! suspend itself at any point with [`yield_now`], and is driven from the
//! outside with [`Fiber::resume`]. Suspension is always explicit: a fiber
//! that never yields runs to completion in a single resume.
//!
//! # State Machine
//!
//! ```text
//! ┌───────┐ resume() ┌─────────┐ yield_now() ┌───────────┐
//! │ Ready │─────────►│ Running │────────────►│ Suspended │
//! └───────┘          └────┬────┘◄────────────└───────────┘
//!                         │         resume()
//!                         │ return / panic
//!                         ▼
//!                   ┌────────────┐
//!                   │ Terminated │
//!                   └────────────┘
//! ```
//!
//! # Failure Containment
//!
//! `resume` never unwinds into the caller. A task that returns `Err` or
//! panics surfaces that failure as the return value of the `resume` call
//! that observed it; panics are converted to [`FiberError::Panicked`].
//!
//! # Thread Affinity
//!
//! The underlying coroutine is `!Send`: a fiber lives and dies on the
//! thread that created it. Dropping a suspended fiber unwinds its stack,
//! reclaiming it.

use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;

use crate::error::FiberError;

/// Default fiber stack size (2 MiB).
pub const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

type FiberCoroutine = Coroutine<(), (), Result<(), FiberError>>;

thread_local! {
    /// Yielder of the fiber currently running on this thread.
    ///
    /// Installed by the fiber entry shim, re-installed after every
    /// suspension, and cleared by [`Fiber::resume`] once control is back
    /// with the resumer. Empty whenever no fiber is running, which is what
    /// makes [`yield_now`] a no-op on bare threads.
    static ACTIVE_YIELDER: Cell<Option<NonNull<Yielder<(), ()>>>> = const { Cell::new(None) };
}

/// Execution state of a [`Fiber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    /// Created, never resumed.
    Ready,
    /// Currently executing on its own stack.
    Running,
    /// Yielded; waiting for the next resume.
    Suspended,
    /// Ran to completion (or failed). Resuming again is a no-op.
    Terminated,
}

/// Stackful cooperative task.
///
/// Owned exclusively by its scheduler's ready list; a fiber never migrates
/// between schedulers.
///
/// # Example
///
/// ```
/// use weft_fiber::{yield_now, Fiber, FiberState};
///
/// let mut fiber = Fiber::new(|| {
///     yield_now();
///     Ok(())
/// });
/// assert_eq!(fiber.state(), FiberState::Ready);
///
/// assert!(fiber.resume().is_none());
/// assert_eq!(fiber.state(), FiberState::Suspended);
///
/// assert!(fiber.resume().is_none());
/// assert!(fiber.is_terminated());
/// ```
pub struct Fiber {
    co: FiberCoroutine,
    state: FiberState,
}

impl Fiber {
    /// Creates a fiber around `task` with the default
    /// [`DEFAULT_STACK_SIZE`] stack.
    ///
    /// # Panics
    ///
    /// Panics when the stack cannot be mapped (the same contract as
    /// `std::thread::spawn`); use [`with_stack_size`](Self::with_stack_size)
    /// to handle allocation failure instead.
    pub fn new<F>(task: F) -> Self
    where
        F: FnOnce() -> Result<(), FiberError> + 'static,
    {
        Self::with_stack_size(task, DEFAULT_STACK_SIZE).expect("fiber stack allocation failed")
    }

    /// Creates a fiber with an explicit stack size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FiberError::StackAllocation`] when the stack cannot be
    /// mapped.
    pub fn with_stack_size<F>(task: F, stack_bytes: usize) -> Result<Self, FiberError>
    where
        F: FnOnce() -> Result<(), FiberError> + 'static,
    {
        let stack = DefaultStack::new(stack_bytes)?;
        let co: FiberCoroutine = Coroutine::with_stack(stack, move |yielder, ()| {
            ACTIVE_YIELDER.with(|slot| slot.set(Some(NonNull::from(yielder))));
            task()
        });
        Ok(Self {
            co,
            state: FiberState::Ready,
        })
    }

    /// Runs the fiber until it next yields or terminates.
    ///
    /// Returns the failure the fiber body propagated, if any; `None` means
    /// it yielded or completed cleanly. Failures are returned, never
    /// rethrown; a panicking task is caught here and reported as
    /// [`FiberError::Panicked`]. Resuming a terminated fiber is a no-op.
    pub fn resume(&mut self) -> Option<FiberError> {
        if self.state == FiberState::Terminated {
            return None;
        }
        self.state = FiberState::Running;

        // The resumer may itself be a fiber (one scheduler driven from
        // inside another); its yielder becomes current again on return.
        let resumer = ACTIVE_YIELDER.with(Cell::get);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.co.resume(())));

        ACTIVE_YIELDER.with(|slot| slot.set(resumer));

        match outcome {
            Ok(CoroutineResult::Yield(())) => {
                self.state = FiberState::Suspended;
                None
            }
            Ok(CoroutineResult::Return(Ok(()))) => {
                self.state = FiberState::Terminated;
                None
            }
            Ok(CoroutineResult::Return(Err(err))) => {
                self.state = FiberState::Terminated;
                Some(err)
            }
            Err(payload) => {
                self.state = FiberState::Terminated;
                Some(FiberError::Panicked(panic_message(payload.as_ref())))
            }
        }
    }

    /// Returns the fiber's current state.
    #[must_use]
    pub fn state(&self) -> FiberState {
        self.state
    }

    /// Returns `true` once the fiber has run to completion.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state == FiberState::Terminated
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber").field("state", &self.state).finish()
    }
}

/// Suspends the currently running fiber, returning control to its resumer.
///
/// A no-op when called outside any fiber, so code shared between fibers
/// and bare threads can call this unconditionally.
pub fn yield_now() {
    let Some(ptr) = ACTIVE_YIELDER.with(Cell::get) else {
        return;
    };
    // Safety: the pointee is the yielder of the fiber we are executing on
    // right now; it lives on the resumer's frame for the whole time this
    // fiber is running. The slot is cleared before control can reach any
    // other fiber or the bare thread.
    let yielder = unsafe { ptr.as_ref() };
    yielder.suspend(());
    // Resumed: re-install ourselves as the running fiber.
    ACTIVE_YIELDER.with(|slot| slot.set(Some(ptr)));
}

/// Returns `true` when the caller is executing inside a fiber.
#[must_use]
pub fn in_fiber() -> bool {
    ACTIVE_YIELDER.with(Cell::get).is_some()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}
