//! Cooperative fiber scheduling for the weft substrate.
//!
//! This crate provides the execution half of weft: stackful fibers
//! multiplexed over a single OS thread by a round-robin scheduler, plus the
//! per-thread context slots that let code discover the scheduler it is
//! running under.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       ThreadScheduler                         │
//! │   spawn() ──► OS thread ──► context slot ◄── FiberScheduler   │
//! └───────────────────────────────────────────────────────────────┘
//!                                   │
//!              ┌────────────────────┼────────────────────┐
//!              ▼                    ▼                    ▼
//!        ┌──────────┐         ┌──────────┐         ┌──────────┐
//!        │ Fiber #0 │──yield─►│ Fiber #1 │──yield─►│ Fiber #2 │──┐
//!        └──────────┘         └──────────┘         └──────────┘  │
//!              ▲                                                 │
//!              └────────────────── round-robin ──────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Fiber`] | Stackful cooperative task with explicit yield/resume |
//! | [`FiberScheduler`] | Round-robin owner of fibers on one thread |
//! | [`ThreadScheduler`] | Spawns OS threads pre-wired with a fiber scheduler |
//! | [`FiberCondition`] | Condition variable analog that waits by yielding |
//! | [`ThreadCondition`] | OS condition variable for bare-thread waiters |
//! | [`context`] | Per-thread slots holding the active scheduler |
//!
//! # Two Coexisting Models
//!
//! Scheduling is cooperative *within* a [`FiberScheduler`] (suspension only
//! at explicit yield points) and preemptive *across* OS threads (each
//! thread runs at most one scheduler). A fiber never migrates between
//! schedulers.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weft_fiber::FiberScheduler;
//!
//! let scheduler = Rc::new(FiberScheduler::new());
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sched = Rc::clone(&scheduler);
//! let out = Rc::clone(&log);
//! scheduler
//!     .start(move || {
//!         let inner = Rc::clone(&out);
//!         sched.spawn(move || {
//!             inner.borrow_mut().push("second");
//!             Ok(())
//!         });
//!         out.borrow_mut().push("first");
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(*log.borrow(), ["second", "first"]);
//! ```
//!
//! (`spawn` yields after enqueueing, which is why the spawned fiber runs
//! before the spawner's next statement.)
//!
//! # Error Handling
//!
//! Fiber tasks return `Result<(), FiberError>`. A task that returns
//! [`FiberError::OwnerTerminated`] ends the dispatch loop cleanly; any
//! other failure unwinds the loop and re-emerges from
//! [`FiberScheduler::start`].

pub mod context;

mod condition;
mod error;
mod fiber;
mod scheduler;
mod thread;

pub use condition::{FiberCondition, ThreadCondition};
pub use error::FiberError;
pub use fiber::{in_fiber, yield_now, Fiber, FiberState, DEFAULT_STACK_SIZE};
pub use scheduler::FiberScheduler;
pub use thread::ThreadScheduler;
