//! Asynchronous receive for the unbounded channel.

use super::core::UChanShared;
use crate::error::{RecvError, TryRecvError};
use crate::internal::fast_path::Registration;
use crate::internal::waiter::{WaiterId, Wakeup};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`UnboundedChannel::recv_async`](super::UnboundedChannel::recv_async).
///
/// Dropping it before completion is safe: a value that was already handed to
/// this future is left in the channel and the next waiter is woken for it.
#[must_use = "futures do nothing unless you .await or poll them"]
#[derive(Debug)]
pub struct RecvFuture<'a, T> {
  pub(super) shared: &'a UChanShared<T>,
  pub(super) waiter: Option<WaiterId>,
}

impl<'a, T> Future for RecvFuture<'a, T> {
  type Output = Result<T, RecvError>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = &mut *self;

    // Still queued and not yet handed anything: just refresh the waker.
    if let Some(id) = this.waiter {
      if this.shared.fast_path.update_waker(id, cx.waker()) {
        return Poll::Pending;
      }
      this.waiter = None;
    }

    loop {
      // --- Phase 1: Try to receive without parking ---
      match this.shared.try_recv() {
        Ok(value) => return Poll::Ready(Ok(value)),
        Err(TryRecvError::Closed) => return Poll::Ready(Err(RecvError::Closed)),
        Err(TryRecvError::Empty) => {}
      }

      // --- Phase 2: Register the waker and commit to pending ---
      match this
        .shared
        .fast_path
        .register(Wakeup::Task(cx.waker().clone()))
      {
        Registration::Ready => continue,
        Registration::Parked(id) => {
          this.waiter = Some(id);
          // May hand a value straight to us, which wakes this task again.
          this.shared.drain();
          return Poll::Pending;
        }
      }
    }
  }
}

impl<'a, T> Drop for RecvFuture<'a, T> {
  fn drop(&mut self) {
    if let Some(id) = self.waiter.take() {
      if let Some(next) = self.shared.fast_path.abandon(id) {
        next.wake();
      }
    }
  }
}
