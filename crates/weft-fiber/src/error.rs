//! Fiber layer errors.
//!
//! All errors implement [`ErrorCode`] for standardized handling.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`FiberError::OwnerTerminated`] | `FIBER_OWNER_TERMINATED` | No |
//! | [`FiberError::Panicked`] | `FIBER_PANICKED` | No |
//! | [`FiberError::StackAllocation`] | `FIBER_STACK_ALLOCATION` | Yes |
//! | [`FiberError::Task`] | `FIBER_TASK_FAILED` | No |
//!
//! `OwnerTerminated` is not a defect: it is the distinguished termination
//! signal. Raised out of a fiber body it makes the dispatcher exit its loop
//! cleanly instead of propagating the failure to the caller of
//! [`FiberScheduler::start`](crate::FiberScheduler::start).

use thiserror::Error;
use weft_types::ErrorCode;

/// Fiber layer error.
///
/// # Example
///
/// ```
/// use weft_fiber::FiberError;
/// use weft_types::ErrorCode;
///
/// let err = FiberError::Task("worker gave up".into());
/// assert_eq!(err.code(), "FIBER_TASK_FAILED");
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum FiberError {
    /// Termination signal: the owning scheduler is shutting down.
    ///
    /// Returning this from a fiber body ends the dispatch loop cleanly,
    /// leaving any remaining fibers unresumed in the ready list.
    #[error("owner scheduler terminated")]
    OwnerTerminated,

    /// A fiber body panicked.
    ///
    /// The panic is caught at the resume boundary and carried here as the
    /// panic message, so a panicking fiber cannot unwind through the
    /// dispatcher.
    #[error("fiber panicked: {0}")]
    Panicked(String),

    /// Allocating the fiber's stack failed.
    #[error("fiber stack allocation failed: {0}")]
    StackAllocation(#[from] std::io::Error),

    /// A fiber body failed with an application-level message.
    ///
    /// Propagated out of the dispatcher to the caller of `start`.
    #[error("fiber task failed: {0}")]
    Task(String),
}

impl ErrorCode for FiberError {
    fn code(&self) -> &'static str {
        match self {
            Self::OwnerTerminated => "FIBER_OWNER_TERMINATED",
            Self::Panicked(_) => "FIBER_PANICKED",
            Self::StackAllocation(_) => "FIBER_STACK_ALLOCATION",
            Self::Task(_) => "FIBER_TASK_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Stack allocation can succeed on retry under less memory pressure;
        // the rest will not change.
        matches!(self, Self::StackAllocation(_))
    }
}
