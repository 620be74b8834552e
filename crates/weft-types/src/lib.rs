//! Foundational types for the weft concurrency substrate.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  weft-types    : ErrorCode, test assertions   ◄── HERE     │
//! │  weft-fiber    : Fiber, FiberScheduler, conditions, slots  │
//! │  weft-channel  : Channel<T>, wait contexts                 │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate sits at the bottom of the workspace: every weft error type
//! implements [`ErrorCode`] so callers can branch on stable machine-readable
//! codes instead of matching enum variants across crate versions.

mod error;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
