// src/uchan/mod.rs

//! An unbounded channel whose `send` never blocks.
//!
//! Values first go into a bounded "fast path" queue of capacity L. When it is
//! full they wait in an unbounded overflow buffer and are moved across, in
//! order, as receivers free room. Producers therefore never stall, while
//! receivers get a bounded queue to block on.
//!
//! Receivers can:
//!
//! - block: [`UnboundedChannel::recv`]
//! - block with a time limit: [`UnboundedChannel::recv_timeout`]
//! - block until a [`CancelSignal`] fires: [`UnboundedChannel::recv_cancel`]
//! - `.await`: [`UnboundedChannel::recv_async`]
//! - obtain a [`ReceiverHandle`] to wait on alongside other events:
//!   [`UnboundedChannel::recv_as_event`]
//!
//! Shutdown is drain-then-close: after [`UnboundedChannel::close`] further
//! sends fail, but every value accepted before the close is still received
//! before receivers observe `Closed`.
//!
//! `UnboundedChannel` is a handle. Clones refer to the same channel, so any
//! clone can send, receive or close.
//!
//! # Examples
//!
//! ```
//! use fibre_uchan::{RecvError, UnboundedChannel};
//!
//! let chan = UnboundedChannel::new(1);
//! chan.send(1).unwrap();
//! chan.send(2).unwrap();
//! chan.send(3).unwrap(); // never blocks, even past the fast path capacity
//! chan.close().unwrap();
//!
//! assert_eq!(chan.recv(), Ok(1));
//! assert_eq!(chan.recv(), Ok(2));
//! assert_eq!(chan.recv(), Ok(3));
//! assert_eq!(chan.recv(), Err(RecvError::Closed));
//! assert!(chan.send(4).is_err());
//! ```
//!
//! Waiting on the channel and a timer at once:
//!
//! ```
//! use fibre_uchan::UnboundedChannel;
//! use std::time::Duration;
//!
//! tokio::runtime::Runtime::new().unwrap().block_on(async {
//!   let chan = UnboundedChannel::<u32>::new(4);
//!   let handle = chan.recv_as_event();
//!
//!   tokio::select! {
//!     value = handle.recv_async() => println!("received {:?}", value),
//!     _ = tokio::time::sleep(Duration::from_millis(10)) => {
//!       // Stopped waiting for another reason: release the receive.
//!       handle.cancel();
//!     }
//!   }
//! });
//! ```

mod async_impl;
mod builder;
mod cell;
mod core;
mod event;
mod sync_impl;

pub use self::async_impl::RecvFuture;
pub use self::builder::{ChannelBuilder, DEFAULT_FAST_PATH_CAPACITY, MAX_FAST_PATH_CAPACITY};
pub use self::event::{EventFuture, ReceiverHandle};

use self::core::UChanShared;
use self::sync_impl::WaitError;
use crate::cancel::CancelSignal;
use crate::error::{
  CloseError, RecvCancelError, RecvError, RecvTimeoutError, SendError, TryRecvError,
};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Creates a new unbounded channel with a fast path of `capacity` slots.
pub fn channel<T>(capacity: usize) -> UnboundedChannel<T> {
  UnboundedChannel::new(capacity)
}

/// An unbounded, non-blocking-send channel.
///
/// See the [module documentation](self) for an overview.
pub struct UnboundedChannel<T> {
  shared: Arc<UChanShared<T>>,
}

impl<T> Clone for UnboundedChannel<T> {
  fn clone(&self) -> Self {
    UnboundedChannel {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> fmt::Debug for UnboundedChannel<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UnboundedChannel")
      .field("shared", &self.shared)
      .finish()
  }
}

impl<T> Default for UnboundedChannel<T> {
  fn default() -> Self {
    Self::new(DEFAULT_FAST_PATH_CAPACITY)
  }
}

impl<T> UnboundedChannel<T> {
  /// Creates a channel whose fast path holds `capacity` values.
  ///
  /// Any capacity is valid. A larger fast path means fewer trips through the
  /// overflow lock under load, at the cost of memory. With `0` every value is
  /// buffered in the overflow until a receiver is waiting for it.
  pub fn new(capacity: usize) -> Self {
    UnboundedChannel {
      shared: Arc::new(UChanShared::new(capacity, None)),
    }
  }

  /// Returns a builder for a named or otherwise configured channel.
  pub fn builder() -> ChannelBuilder<T> {
    ChannelBuilder::new()
  }

  /// Sends a value without ever waiting for a receiver.
  ///
  /// # Errors
  ///
  /// Returns the value inside `SendError` if the channel is closed.
  pub fn send(&self, value: T) -> Result<(), SendError<T>> {
    self.shared.send(value)
  }

  /// Sends a final value and closes the channel as one step.
  ///
  /// No other send can land between this value and the close. The value is
  /// received like any other, after which receivers observe `Closed`.
  ///
  /// # Errors
  ///
  /// Returns the value inside `SendError`, without enqueueing it, if the
  /// channel is already closed.
  pub fn send_and_close(&self, value: T) -> Result<(), SendError<T>> {
    self.shared.send_and_close(value)
  }

  /// Receives a value if one is available right now.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.shared.try_recv()
  }

  /// Blocks the current thread until a value arrives.
  ///
  /// # Errors
  ///
  /// `RecvError::Closed` once the channel is closed and every buffered value
  /// has been received.
  pub fn recv(&self) -> Result<T, RecvError> {
    sync_impl::recv_blocking(&self.shared, None, None).map_err(|_| RecvError::Closed)
  }

  /// Blocks for at most `timeout`.
  ///
  /// A value that is already queued is returned without waiting, even for a
  /// zero timeout. The timeout is a minimum wait, not a deadline guarantee.
  pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
    let deadline = Instant::now().checked_add(timeout);
    sync_impl::recv_blocking(&self.shared, deadline, None).map_err(|err| match err {
      WaitError::TimedOut => RecvTimeoutError::TimedOut,
      WaitError::Closed | WaitError::Canceled => RecvTimeoutError::Closed,
    })
  }

  /// Blocks until a value arrives or `signal` fires.
  ///
  /// A value that is already queued is returned even if the signal has fired.
  /// A value handed to this receive as the signal fires is not lost: it stays
  /// in the channel for the next receiver.
  pub fn recv_cancel(&self, signal: &CancelSignal) -> Result<T, RecvCancelError> {
    sync_impl::recv_blocking(&self.shared, None, Some(signal)).map_err(|err| match err {
      WaitError::Canceled => RecvCancelError::Canceled,
      WaitError::Closed | WaitError::TimedOut => RecvCancelError::Closed,
    })
  }

  /// Receives asynchronously.
  ///
  /// The future is cancel-safe: dropping it never loses a value.
  pub fn recv_async(&self) -> RecvFuture<'_, T> {
    RecvFuture {
      shared: &self.shared,
      waiter: None,
    }
  }

  /// Closes the channel.
  ///
  /// Later sends fail. Values already buffered remain receivable; receivers
  /// observe `Closed` only after the last one is taken.
  ///
  /// # Errors
  ///
  /// Returns `CloseError` if the channel was already closed.
  pub fn close(&self) -> Result<(), CloseError> {
    self.shared.close()
  }

  /// Returns `true` once the channel has been closed.
  ///
  /// Buffered values may still be waiting to be received.
  pub fn is_closed(&self) -> bool {
    self.shared.is_closed()
  }

  /// Number of values buffered across the fast path and the overflow.
  ///
  /// A snapshot; concurrent sends and receives may change it immediately.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Returns `true` if no values are buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The fast path capacity L this channel was built with.
  pub fn capacity(&self) -> usize {
    self.shared.fast_path.capacity()
  }

  /// The name given through [`ChannelBuilder::name`], if any.
  pub fn name(&self) -> Option<&str> {
    self.shared.name.as_deref()
  }
}

impl<T: Send + 'static> UnboundedChannel<T> {
  /// Starts a receive in the background and returns a handle to it.
  ///
  /// Use this to wait on the channel together with other event sources. The
  /// handle yields the received value, or `Closed` if the channel closes empty
  /// or the handle is canceled. Call [`ReceiverHandle::cancel`] (or drop the
  /// handle) when you stop waiting on it for any other reason.
  pub fn recv_as_event(&self) -> ReceiverHandle<T> {
    let thread_name = match self.name() {
      Some(name) => format!("uchan-event-{}", name),
      None => "uchan-event".to_string(),
    };
    ReceiverHandle::spawn(Arc::clone(&self.shared), thread_name)
  }
}
