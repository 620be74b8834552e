//! Typed bounded channels for the weft substrate.
//!
//! A [`Channel`] brokers values between producers and consumers with
//! CSP-style rendezvous semantics: a bounded FIFO buffer absorbs traffic
//! up to its capacity, and beyond that senders and receivers pair up
//! directly, each side parking until its peer arrives.
//!
//! The same channel serves every combination of callers:
//!
//! | Caller | Waits by |
//! |--------|----------|
//! | fiber with a scheduler installed | yielding cooperatively |
//! | bare OS thread | blocking on an OS condition variable |
//!
//! The caller's kind is probed per operation from the [thread context
//! slots](weft_fiber::context); wakers never need to know which kind of
//! waiter they release.
//!
//! # Example
//!
//! ```
//! use weft_channel::Channel;
//!
//! let channel = Channel::new(1);
//! assert!(channel.send(7));
//!
//! let mut out = 0;
//! assert!(channel.receive(&mut out));
//! assert_eq!(out, 7);
//!
//! channel.close();
//! assert!(!channel.send(8));
//! ```

mod channel;
mod wait;

pub use channel::Channel;
