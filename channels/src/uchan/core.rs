// src/uchan/core.rs

//! The shared state of the unbounded channel and its non-blocking operations.
//!
//! ### Design Principles:
//!
//! 1.  **Two Stages**: Values first try the bounded fast path. When it is
//!     saturated they wait in the overflow buffer, and are moved across by the
//!     drain step as receivers free room.
//! 2.  **One Linearization Point**: Every send takes the overflow lock and
//!     flushes older overflow values before its own, so a new value never
//!     overtakes a buffered one.
//! 3.  **Deferred Real Close**: `close` only flips a flag. The fast path itself
//!     is closed once the overflow is empty, so receivers drain everything
//!     that was accepted before they observe `Closed`.
//! 4.  **Wake Outside Locks**: Wakeups gathered under a lock are fired after
//!     the lock is released.

use crate::error::{CloseError, SendError, TryRecvError, TrySendError};
use crate::internal::fast_path::{FastPath, TakeError};
use crate::internal::overflow::{self, OverflowBuffer};
use crate::internal::waiter::{wake_all, Wakeup};

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) struct UChanShared<T> {
  pub(crate) fast_path: FastPath<T>,
  pub(crate) overflow: OverflowBuffer<T>,
  pub(crate) closed: AtomicBool,
  pub(crate) name: Option<String>,
}

impl<T> fmt::Debug for UChanShared<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UChanShared")
      .field("name", &self.name)
      .field("fast_path", &self.fast_path)
      .field("overflow", &self.overflow)
      .field("closed", &self.closed.load(Ordering::Relaxed))
      .finish()
  }
}

impl<T> UChanShared<T> {
  pub(crate) fn new(capacity: usize, name: Option<String>) -> Self {
    UChanShared {
      fast_path: FastPath::new(capacity),
      overflow: OverflowBuffer::new(),
      closed: AtomicBool::new(false),
      name,
    }
  }

  #[inline]
  pub(crate) fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("")
  }

  #[inline]
  pub(crate) fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  pub(crate) fn len(&self) -> usize {
    // Overflow first: a value moving across between the two reads is then
    // counted twice rather than missed.
    let overflow = self.overflow.len();
    overflow + self.fast_path.len()
  }

  /// Drain-then-append. Must be called with the overflow lock held.
  fn enqueue_locked(&self, pending: &mut VecDeque<T>, value: T, wakeups: &mut Vec<Wakeup>) {
    if !overflow::flush_front(pending, &self.fast_path, wakeups) {
      pending.push_back(value);
      tracing::trace!(channel = self.label(), buffered = pending.len(), "fast path full, value spilled to overflow");
      return;
    }
    match self.fast_path.try_send(value) {
      Ok(wakeup) => wakeups.extend(wakeup),
      // Lost a race with a receiver, or nobody is waiting on a zero-capacity
      // fast path. `Closed` cannot happen while the flag is unset under the lock.
      Err(TrySendError::Full(value)) | Err(TrySendError::Closed(value)) => pending.push_back(value),
    }
  }

  /// Moves overflow values into freed fast path room and performs the real
  /// close once the overflow is empty. Overflow lock must be held.
  fn drain_locked(&self, pending: &mut VecDeque<T>, wakeups: &mut Vec<Wakeup>) {
    if pending.is_empty() {
      if self.is_closed() {
        self.close_fast_path(wakeups);
      }
      return;
    }
    if overflow::flush_front(pending, &self.fast_path, wakeups) && self.is_closed() {
      self.close_fast_path(wakeups);
    }
  }

  fn close_fast_path(&self, wakeups: &mut Vec<Wakeup>) {
    if let Some(waiters) = self.fast_path.close() {
      tracing::debug!(channel = self.label(), waiters = waiters.len(), "fast path closed");
      wakeups.extend(waiters);
    }
  }

  /// The drain step, run after every successful receive from the fast path
  /// and after a receiver registers as a waiter.
  pub(crate) fn drain(&self) {
    let mut wakeups = Vec::new();
    {
      let mut pending = self.overflow.lock();
      self.drain_locked(&mut pending, &mut wakeups);
    }
    wake_all(wakeups);
  }

  pub(crate) fn send(&self, value: T) -> Result<(), SendError<T>> {
    if self.is_closed() {
      return Err(SendError(value));
    }

    let mut wakeups = Vec::new();
    let result = {
      let mut pending = self.overflow.lock();
      // A concurrent `close` may have flipped the flag and taken the lock first.
      if self.is_closed() {
        Err(SendError(value))
      } else {
        self.enqueue_locked(&mut pending, value, &mut wakeups);
        Ok(())
      }
    };
    wake_all(wakeups);
    result
  }

  pub(crate) fn send_and_close(&self, value: T) -> Result<(), SendError<T>> {
    if self.is_closed() {
      return Err(SendError(value));
    }

    let mut wakeups = Vec::new();
    let result = {
      let mut pending = self.overflow.lock();
      if self.is_closed() {
        Err(SendError(value))
      } else {
        self.enqueue_locked(&mut pending, value, &mut wakeups);
        // Flipped before the lock is released: no send can slip in between.
        self.closed.store(true, Ordering::Release);
        tracing::debug!(channel = self.label(), buffered = pending.len(), "channel closed after final send");
        if pending.is_empty() {
          self.close_fast_path(&mut wakeups);
        }
        Ok(())
      }
    };
    wake_all(wakeups);
    result
  }

  pub(crate) fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return Err(CloseError);
    }

    let mut wakeups = Vec::new();
    {
      let pending = self.overflow.lock();
      if pending.is_empty() {
        // Nothing left to drain.
        self.close_fast_path(&mut wakeups);
      } else {
        tracing::debug!(
          channel = self.label(),
          buffered = pending.len(),
          "channel closed, fast path stays open until the overflow drains"
        );
      }
    }
    wake_all(wakeups);
    Ok(())
  }

  /// Non-blocking receive.
  pub(crate) fn try_recv(&self) -> Result<T, TryRecvError> {
    self.take(&|| true).map_err(|err| match err {
      TakeError::Closed => TryRecvError::Closed,
      TakeError::Empty | TakeError::Refused => TryRecvError::Empty,
    })
  }

  /// Takes the oldest value, provided `claim` agrees.
  ///
  /// `claim` is consulted under the lock guarding the value, right before it
  /// is removed, so a refused value never leaves the channel and no other
  /// receiver can observe it missing.
  ///
  /// Falls back to the overflow front when the fast path is empty, which is
  /// the oldest value at that point. This keeps the probe meaningful for a
  /// zero-capacity fast path, where values only enter it for a waiting receiver.
  pub(crate) fn take(&self, claim: &dyn Fn() -> bool) -> Result<T, TakeError> {
    match self.fast_path.take_if(claim) {
      Ok(value) => {
        self.drain();
        return Ok(value);
      }
      Err(TakeError::Empty) => {}
      Err(err) => return Err(err),
    }

    let mut wakeups = Vec::new();
    let result = {
      let mut pending = self.overflow.lock();
      // Re-check under the lock; a send may have filled the fast path meanwhile.
      let result = match self.fast_path.take_if(claim) {
        Err(TakeError::Empty) if pending.is_empty() => Err(TakeError::Empty),
        Err(TakeError::Empty) if !claim() => Err(TakeError::Refused),
        Err(TakeError::Empty) => pending.pop_front().ok_or(TakeError::Empty),
        other => other,
      };
      if result.is_ok() {
        self.drain_locked(&mut pending, &mut wakeups);
      }
      result
    };
    wake_all(wakeups);
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn send_spills_to_overflow_when_fast_path_is_full() {
    let shared = UChanShared::new(1, None);
    shared.send(1).unwrap();
    shared.send(2).unwrap();
    shared.send(3).unwrap();
    assert_eq!(shared.fast_path.len(), 1);
    assert_eq!(shared.overflow.len(), 2);
    assert_eq!(shared.len(), 3);
  }

  #[test]
  fn receive_moves_overflow_front_into_freed_room() {
    let shared = UChanShared::new(1, None);
    for i in 0..3 {
      shared.send(i).unwrap();
    }
    assert_eq!(shared.try_recv(), Ok(0));
    assert_eq!(shared.fast_path.len(), 1);
    assert_eq!(shared.overflow.len(), 1);
  }

  #[test]
  fn close_with_buffered_values_defers_fast_path_close() {
    let shared = UChanShared::new(1, None);
    shared.send(1).unwrap();
    shared.send(2).unwrap();
    shared.close().unwrap();
    assert!(shared.is_closed());
    assert!(!shared.fast_path.is_closed());

    assert_eq!(shared.try_recv(), Ok(1));
    // The last overflow value moved across, so the fast path is now closed.
    assert!(shared.fast_path.is_closed());
    assert_eq!(shared.try_recv(), Ok(2));
    assert_eq!(shared.try_recv(), Err(TryRecvError::Closed));
  }

  #[test]
  fn close_on_empty_channel_closes_fast_path_at_once() {
    let shared = UChanShared::<u8>::new(4, None);
    shared.close().unwrap();
    assert!(shared.fast_path.is_closed());
    assert_eq!(shared.close(), Err(CloseError));
  }

  #[test]
  fn zero_capacity_probe_reads_the_overflow() {
    let shared = UChanShared::new(0, None);
    shared.send('a').unwrap();
    shared.send('b').unwrap();
    assert_eq!(shared.fast_path.len(), 0);
    assert_eq!(shared.try_recv(), Ok('a'));
    assert_eq!(shared.try_recv(), Ok('b'));
    assert_eq!(shared.try_recv(), Err(TryRecvError::Empty));
  }

  #[test]
  fn refused_claim_keeps_fast_path_value_after_close() {
    let shared = UChanShared::new(1, None);
    shared.send_and_close(7).unwrap();
    assert_eq!(shared.take(&|| false), Err(TakeError::Refused));
    assert_eq!(shared.len(), 1);
    assert_eq!(shared.try_recv(), Ok(7));
    assert_eq!(shared.try_recv(), Err(TryRecvError::Closed));
  }

  #[test]
  fn refused_claim_keeps_overflow_value() {
    let shared = UChanShared::new(0, None);
    shared.send(1).unwrap();
    shared.send(2).unwrap();
    assert_eq!(shared.take(&|| false), Err(TakeError::Refused));
    assert_eq!(shared.try_recv(), Ok(1));
    assert_eq!(shared.try_recv(), Ok(2));
  }
}
