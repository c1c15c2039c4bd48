// src/uchan/cell.rs

//! Single-slot delivery cell behind a `ReceiverHandle`.
//!
//! One producer (the handle's background receive) delivers at most one value;
//! one consumer takes it. Delivery closes the cell with the value inside;
//! cancellation closes it empty. A delivered value stays takeable.

use crate::async_util::AtomicWaker;
use crate::error::{RecvError, RecvTimeoutError, TryRecvError};
use crate::sync_util;

use parking_lot::Mutex;
use std::fmt;
use std::task::{Context, Poll};
use std::thread::{self, Thread};
use std::time::Instant;

struct CellState<T> {
  value: Option<T>,
  closed: bool,
  waiting_thread: Option<Thread>,
}

pub(crate) struct DeliveryCell<T> {
  state: Mutex<CellState<T>>,
  receiver_waker: AtomicWaker,
}

impl<T> fmt::Debug for DeliveryCell<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("DeliveryCell")
      .field("has_value", &state.value.is_some())
      .field("closed", &state.closed)
      .finish_non_exhaustive()
  }
}

impl<T> DeliveryCell<T> {
  pub(crate) fn new() -> Self {
    DeliveryCell {
      state: Mutex::new(CellState {
        value: None,
        closed: false,
        waiting_thread: None,
      }),
      receiver_waker: AtomicWaker::new(),
    }
  }

  fn notify(&self, waiting_thread: Option<Thread>) {
    if let Some(thread) = waiting_thread {
      sync_util::unpark_thread(&thread);
    }
    self.receiver_waker.wake();
  }

  /// Stores the value and closes the cell in one step.
  ///
  /// Only the side that won the handle's claim calls this, so the cell is
  /// still open and empty.
  pub(crate) fn deliver(&self, value: T) {
    let waiting_thread = {
      let mut state = self.state.lock();
      state.value = Some(value);
      state.closed = true;
      state.waiting_thread.take()
    };
    self.notify(waiting_thread);
  }

  /// Closes the cell. Returns `false` if it was already closed.
  pub(crate) fn close(&self) -> bool {
    let waiting_thread = {
      let mut state = self.state.lock();
      if state.closed {
        return false;
      }
      state.closed = true;
      state.waiting_thread.take()
    };
    self.notify(waiting_thread);
    true
  }

  pub(crate) fn try_take(&self) -> Result<T, TryRecvError> {
    let mut state = self.state.lock();
    match state.value.take() {
      Some(value) => Ok(value),
      None if state.closed => Err(TryRecvError::Closed),
      None => Err(TryRecvError::Empty),
    }
  }

  /// Blocks until a value is available, the cell closes, or `deadline` passes.
  pub(crate) fn take_until(&self, deadline: Option<Instant>) -> Result<T, RecvTimeoutError> {
    loop {
      {
        let mut state = self.state.lock();
        if let Some(value) = state.value.take() {
          return Ok(value);
        }
        if state.closed {
          return Err(RecvTimeoutError::Closed);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
          return Err(RecvTimeoutError::TimedOut);
        }
        state.waiting_thread = Some(thread::current());
      }
      match deadline {
        None => thread::park(),
        Some(d) => {
          if let Some(left) = sync_util::remaining(d) {
            sync_util::park_thread_timeout(left);
          }
        }
      }
    }
  }

  pub(crate) fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Result<T, RecvError>> {
    match self.try_take() {
      Ok(value) => return Poll::Ready(Ok(value)),
      Err(TryRecvError::Closed) => return Poll::Ready(Err(RecvError::Closed)),
      Err(TryRecvError::Empty) => {}
    }

    self.receiver_waker.register(cx.waker());

    // Critical re-check after registering the waker.
    match self.try_take() {
      Ok(value) => Poll::Ready(Ok(value)),
      Err(TryRecvError::Closed) => Poll::Ready(Err(RecvError::Closed)),
      Err(TryRecvError::Empty) => Poll::Pending,
    }
  }
}
