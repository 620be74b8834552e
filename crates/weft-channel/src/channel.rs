//! Channel - bounded FIFO with rendezvous fallback.
//!
//! Every operation runs under the channel's single mutex and resolves
//! through one of three paths:
//!
//! ```text
//!                      send(value)
//!                           │
//!          ┌────────────────┼─────────────────┐
//!          ▼                ▼                 ▼
//!   parked receiver?   buffer room?      park on a new
//!   deliver directly   enqueue value     send wait context
//! ```
//!
//! `receive` mirrors this: a parked sender is served first, then the
//! buffer, then the receiver parks. With capacity 0 the buffer paths never
//! apply and every handoff is a pure rendezvous.
//!
//! # State Invariants
//!
//! Under the mutex:
//!
//! - `buffer.len() <= capacity` always
//! - buffer non-empty ⇒ no parked receivers
//! - parked senders and parked receivers never coexist
//! - once closed, the buffer stays empty and both waiter queues drain
//!   monotonically to empty
//!
//! # Ordering
//!
//! Buffered items are delivered FIFO; parked waiters are released FIFO per
//! queue (including at close, receivers first). No ordering holds across
//! channels.
//!
//! # Failure Model
//!
//! The only failure is "channel closed", surfaced as a `false` return,
//! never as a panic or error value. A send into a full, never-closed
//! channel with no receivers blocks forever; that starvation hazard is
//! part of the contract, and [`try_receive`](Channel::try_receive) is the
//! only non-blocking path.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::wait::WaitContext;

/// Typed bounded channel with rendezvous fallback.
///
/// Shared between endpoints as `Arc<Channel<T>>`; all methods take
/// `&self`. Endpoints may be fibers sharing one scheduler, fibers on
/// different threads, or bare threads with no scheduler at all; each
/// caller is classified per operation, so one channel can broker any
/// mixture.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use weft_channel::Channel;
///
/// // Capacity 0: pure rendezvous between two bare threads.
/// let channel = Arc::new(Channel::new(0));
///
/// let sender = Arc::clone(&channel);
/// let producer = thread::spawn(move || sender.send(21));
///
/// let mut out = 0;
/// assert!(channel.receive(&mut out));
/// assert_eq!(out, 21);
/// assert!(producer.join().unwrap());
/// ```
pub struct Channel<T> {
    capacity: usize,
    state: Mutex<ChannelState<T>>,
}

struct ChannelState<T> {
    closed: bool,
    buffer: VecDeque<T>,
    send_waiters: VecDeque<Arc<WaitContext<T>>>,
    recv_waiters: VecDeque<Arc<WaitContext<T>>>,
}

impl<T> Channel<T> {
    /// Creates a channel holding at most `capacity` buffered values.
    ///
    /// Capacity 0 makes every handoff a rendezvous: `send` completes only
    /// when a receiver takes the value, and vice versa.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(ChannelState {
                closed: false,
                buffer: VecDeque::with_capacity(capacity),
                send_waiters: VecDeque::new(),
                recv_waiters: VecDeque::new(),
            }),
        }
    }

    /// Returns the buffer capacity this channel was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sends a value, parking until it is accepted if need be.
    ///
    /// Returns `false` when the channel is closed, either already at the
    /// call or while this sender was parked waiting for a receiver (the
    /// value is dropped in both cases). Returns `true` once the value has
    /// been buffered or handed to a receiver.
    pub fn send(&self, value: T) -> bool {
        let waiter = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            if let Some(receiver) = state.recv_waiters.pop_front() {
                receiver.put_value(value);
                receiver.mark_delivered();
                drop(state);
                // Notify outside the mutex so the woken party can take the
                // channel lock without contending with us.
                receiver.notify();
                return true;
            }
            if state.buffer.len() < self.capacity {
                state.buffer.push_back(value);
                return true;
            }
            let context = WaitContext::sender(value);
            state.send_waiters.push_back(Arc::clone(&context));
            context
        };

        waiter.park();
        waiter.was_delivered()
    }

    /// Receives a value into `destination`, parking until one arrives.
    ///
    /// Returns `false` when the channel is closed (at the call, or while
    /// parked), writing `T::default()` through `destination`. Returns
    /// `true` with the received value otherwise.
    pub fn receive(&self, destination: &mut T) -> bool
    where
        T: Default,
    {
        self.receive_with(destination, true)
    }

    /// Non-blocking variant of [`receive`](Self::receive).
    ///
    /// Identical behavior except that an empty, open channel yields
    /// `false` immediately instead of parking. Never suspends.
    pub fn try_receive(&self, destination: &mut T) -> bool
    where
        T: Default,
    {
        self.receive_with(destination, false)
    }

    fn receive_with(&self, destination: &mut T, park: bool) -> bool
    where
        T: Default,
    {
        let waiter = {
            let mut state = self.state.lock();
            if state.closed {
                *destination = T::default();
                return false;
            }
            if let Some(sender) = state.send_waiters.pop_front() {
                let Some(value) = sender.take_value() else {
                    // A queued sender always carries its offered value.
                    unreachable!("parked sender without a value");
                };
                sender.mark_delivered();
                drop(state);
                sender.notify();
                *destination = value;
                return true;
            }
            if let Some(value) = state.buffer.pop_front() {
                *destination = value;
                return true;
            }
            if !park {
                return false;
            }
            let context = WaitContext::receiver();
            state.recv_waiters.push_back(Arc::clone(&context));
            context
        };

        waiter.park();
        match waiter.take_value() {
            Some(value) => {
                *destination = value;
                true
            }
            // Woken by close: nothing was delivered.
            None => {
                *destination = T::default();
                false
            }
        }
    }

    /// Closes the channel, waking every parked waiter.
    ///
    /// Parked receivers return `false` with a default value; parked
    /// senders return `false` with their value dropped. The buffer is
    /// discarded. Idempotent: closing twice is a no-op.
    pub fn close(&self) {
        let (receivers, senders) = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.buffer.clear();
            (
                std::mem::take(&mut state.recv_waiters),
                std::mem::take(&mut state.send_waiters),
            )
        };

        if !receivers.is_empty() || !senders.is_empty() {
            debug!(
                "channel closed: waking {} receiver(s), {} sender(s)",
                receivers.len(),
                senders.len()
            );
        }
        for waiter in receivers {
            waiter.notify();
        }
        for waiter in senders {
            waiter.notify();
        }
    }

    /// Snapshot of the closed flag.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        // A parked waiter at drop time would never be woken.
        debug_assert!(
            state.send_waiters.is_empty() && state.recv_waiters.is_empty(),
            "channel dropped with parked waiters"
        );
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .field("buffered", &state.buffer.len())
            .field("send_waiters", &state.send_waiters.len())
            .field("recv_waiters", &state.recv_waiters.len())
            .finish()
    }
}
