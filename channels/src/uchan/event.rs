// src/uchan/event.rs

//! Receive-as-event: a single-use handle backed by a background receive.
//!
//! The handle lets a caller wait on the channel together with other event
//! sources (timers, other channels) by waiting on the handle's delivery cell.
//! A dedicated thread runs a cancellable receive against the handle's own
//! signal and publishes the value into the cell.
//!
//! Delivery and cancellation both flip the same `canceled` flag, so exactly
//! one of them wins. The background receive flips it under the channel lock
//! at the moment it removes a value, never after:
//!
//! - the background receive wins: the value goes into the cell, the cell is
//!   closed, and a later `cancel()` returns `false`;
//! - `cancel()` wins: the cell is closed empty, the signal fires, and the
//!   background receive leaves every value where it is.

use super::cell::DeliveryCell;
use super::core::UChanShared;
use super::sync_impl::{self, WaitError};
use crate::cancel::CancelSignal;
use crate::error::{RecvError, RecvTimeoutError, TryRecvError};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub(crate) struct HandleState<T> {
  cell: DeliveryCell<T>,
  signal: CancelSignal,
  canceled: AtomicBool,
}

impl<T> HandleState<T> {
  fn new() -> Self {
    HandleState {
      cell: DeliveryCell::new(),
      signal: CancelSignal::new(),
      canceled: AtomicBool::new(false),
    }
  }

  /// Flips `canceled`. Only the winner may touch the cell.
  #[inline]
  fn claim(&self) -> bool {
    self
      .canceled
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  fn cancel(&self) -> bool {
    if !self.claim() {
      return false;
    }
    self.cell.close();
    self.signal.fire();
    true
  }
}

/// Body of the background receive.
fn run_event_receive<T>(shared: &UChanShared<T>, state: &HandleState<T>) {
  let claim = || state.claim();
  match sync_impl::recv_claimed(shared, None, Some(&state.signal), &claim) {
    // The claim was won when the value left the channel.
    Ok(value) => state.cell.deliver(value),
    Err(WaitError::Closed) | Err(WaitError::Canceled) | Err(WaitError::TimedOut) => {
      state.cancel();
    }
  }
}

/// A single-use receive returned by
/// [`UnboundedChannel::recv_as_event`](super::UnboundedChannel::recv_as_event).
///
/// The handle eventually yields exactly one of: the received value, or
/// `Closed` (channel closed and drained, or the handle was canceled).
///
/// If you stop waiting on the handle for any other reason, call
/// [`cancel`](Self::cancel) or drop the handle. Dropping cancels the receive
/// and joins the background thread.
pub struct ReceiverHandle<T: Send + 'static> {
  state: Arc<HandleState<T>>,
  task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> fmt::Debug for ReceiverHandle<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReceiverHandle")
      .field("canceled", &self.is_canceled())
      .field("cell", &self.state.cell)
      .field("task_running", &self.task.as_ref().is_some_and(|t| !t.is_finished()))
      .finish()
  }
}

impl<T: Send + 'static> ReceiverHandle<T> {
  pub(super) fn spawn(shared: Arc<UChanShared<T>>, thread_name: String) -> Self {
    let state = Arc::new(HandleState::new());
    let task_state = Arc::clone(&state);
    let spawned = thread::Builder::new()
      .name(thread_name)
      .spawn(move || run_event_receive(&shared, &task_state));

    let task = match spawned {
      Ok(task) => Some(task),
      Err(err) => {
        // Nothing will ever be delivered; close so waiters do not hang.
        tracing::error!(error = %err, "failed to spawn receive-as-event thread");
        state.cancel();
        None
      }
    };
    ReceiverHandle { state, task }
  }

  /// Cancels the pending receive and closes the delivery cell.
  ///
  /// Returns `true` only for the call that performed the cancellation.
  /// Returns `false` if the handle was already canceled or a value has
  /// already been delivered; a delivered value stays receivable.
  pub fn cancel(&self) -> bool {
    let canceled = self.state.cancel();
    if canceled {
      tracing::debug!("receive-as-event canceled");
    }
    canceled
  }

  /// Returns `true` once the handle was canceled or delivered its value.
  pub fn is_canceled(&self) -> bool {
    self.state.canceled.load(Ordering::Acquire)
  }

  /// Takes the delivered value without blocking.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.state.cell.try_take()
  }

  /// Blocks until the value is delivered or the cell closes empty.
  pub fn recv(&self) -> Result<T, RecvError> {
    self.state.cell.take_until(None).map_err(|_| RecvError::Closed)
  }

  /// Like [`recv`](Self::recv), giving up after `timeout`.
  ///
  /// Timing out does not cancel the handle.
  pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
    let deadline = Instant::now().checked_add(timeout);
    self.state.cell.take_until(deadline)
  }

  /// Waits for the delivered value from async code.
  ///
  /// Dropping the future does not cancel the handle.
  pub fn recv_async(&self) -> EventFuture<'_, T> {
    EventFuture { handle: self }
  }
}

impl<T: Send + 'static> Drop for ReceiverHandle<T> {
  fn drop(&mut self) {
    self.state.cancel();
    if let Some(task) = self.task.take() {
      // The canceled receive returns promptly; a panic there is not ours to rethrow.
      if task.join().is_err() {
        tracing::error!("receive-as-event thread panicked");
      }
    }
  }
}

/// Future returned by [`ReceiverHandle::recv_async`].
#[must_use = "futures do nothing unless you .await or poll them"]
#[derive(Debug)]
pub struct EventFuture<'a, T: Send + 'static> {
  handle: &'a ReceiverHandle<T>,
}

impl<'a, T: Send + 'static> Future for EventFuture<'a, T> {
  type Output = Result<T, RecvError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    self.handle.state.cell.poll_take(cx)
  }
}
