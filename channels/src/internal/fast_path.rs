//! The capacity-bounded queue that receivers read from.
//!
//! A single `parking_lot::Mutex` guards the buffer, the waiting receivers and
//! the closed flag. Receivers that find the queue empty register a `Wakeup`;
//! a registered receiver counts as free room, so with a capacity of `0` an
//! item is accepted exactly when somebody is waiting for it.
//!
//! No method wakes anybody while the lock is held. Wakeups are returned to the
//! caller, which fires them once every lock it holds has been released.

use super::waiter::{WaiterId, WaiterList, Wakeup};
use crate::error::{TryRecvError, TrySendError};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::task::Waker;

// Upper bound on the buffer allocated up front.
const MAX_PREALLOCATED: usize = 1024;

/// Outcome of registering a waiting receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
  /// The receiver is queued and will be woken when an item is handed to it
  /// or the queue closes.
  Parked(WaiterId),
  /// An item is already buffered or the queue is closed; retry the receive.
  Ready,
}

/// Why `take_if` returned no item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TakeError {
  Empty,
  Closed,
  /// An item was there but the claim refused it. The item stays queued.
  Refused,
}

struct FastPathInternal<T> {
  queue: VecDeque<T>,
  waiting_receivers: WaiterList,
  closed: bool,
}

pub(crate) struct FastPath<T> {
  internal: Mutex<FastPathInternal<T>>,
  capacity: usize,
}

impl<T> fmt::Debug for FastPath<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let guard = self.internal.lock();
    f.debug_struct("FastPath")
      .field("capacity", &self.capacity)
      .field("len", &guard.queue.len())
      .field("waiting_receivers", &guard.waiting_receivers.len())
      .field("closed", &guard.closed)
      .finish()
  }
}

impl<T> FastPath<T> {
  pub(crate) fn new(capacity: usize) -> Self {
    FastPath {
      internal: Mutex::new(FastPathInternal {
        queue: VecDeque::with_capacity(capacity.min(MAX_PREALLOCATED)),
        waiting_receivers: WaiterList::new(),
        closed: false,
      }),
      capacity,
    }
  }

  #[inline]
  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }

  pub(crate) fn len(&self) -> usize {
    self.internal.lock().queue.len()
  }

  #[cfg(test)]
  pub(crate) fn is_closed(&self) -> bool {
    self.internal.lock().closed
  }

  /// Attempts to enqueue without blocking.
  ///
  /// 1. Hand the item to a waiting receiver, if any.
  /// 2. Push the item into the buffer if there is space.
  ///
  /// On success the returned wakeup, if any, must be fired by the caller.
  pub(crate) fn try_send(&self, item: T) -> Result<Option<Wakeup>, TrySendError<T>> {
    let mut guard = self.internal.lock();

    if guard.closed {
      return Err(TrySendError::Closed(item));
    }

    // --- Priority 1: a receiver is already waiting ---
    if let Some(waiter) = guard.waiting_receivers.pop_front() {
      // The item is buffered for the woken receiver to pick up.
      guard.queue.push_back(item);
      return Ok(Some(waiter));
    }

    // --- Priority 2: buffer space ---
    if guard.queue.len() < self.capacity {
      guard.queue.push_back(item);
      return Ok(None);
    }

    Err(TrySendError::Full(item))
  }

  /// Takes the front item if `claim` agrees. `claim` runs under the queue
  /// lock and only when an item is present, so a refused item never leaves
  /// the queue. Buffered items are still returned after close.
  pub(crate) fn take_if(&self, claim: &dyn Fn() -> bool) -> Result<T, TakeError> {
    let mut guard = self.internal.lock();
    if guard.queue.is_empty() {
      return Err(if guard.closed { TakeError::Closed } else { TakeError::Empty });
    }
    if !claim() {
      return Err(TakeError::Refused);
    }
    guard.queue.pop_front().ok_or(TakeError::Empty)
  }

  #[cfg(test)]
  pub(crate) fn try_recv(&self) -> Result<T, TryRecvError> {
    self.take_if(&|| true).map_err(|err| match err {
      TakeError::Closed => TryRecvError::Closed,
      TakeError::Empty | TakeError::Refused => TryRecvError::Empty,
    })
  }

  /// Registers a waiting receiver unless an item or the close is already
  /// observable, in which case the caller must retry instead of parking.
  pub(crate) fn register(&self, wakeup: Wakeup) -> Registration {
    let mut guard = self.internal.lock();
    if !guard.queue.is_empty() || guard.closed {
      return Registration::Ready;
    }
    Registration::Parked(guard.waiting_receivers.push(wakeup))
  }

  /// Refreshes the waker of a pending future. Returns `false` if the waiter
  /// has already been woken and removed from the list.
  pub(crate) fn update_waker(&self, id: WaiterId, waker: &Waker) -> bool {
    self.internal.lock().waiting_receivers.update_waker(id, waker)
  }

  /// Removes a waiter that is about to retry its receive.
  pub(crate) fn unregister(&self, id: WaiterId) {
    self.internal.lock().waiting_receivers.remove(id);
  }

  /// Removes a waiter that gives up without receiving (timeout, cancel,
  /// dropped future).
  ///
  /// If the waiter had already been chosen for a hand-off, the item it was
  /// meant to take is still buffered; the next waiter is then returned so the
  /// caller can wake it in its place.
  pub(crate) fn abandon(&self, id: WaiterId) -> Option<Wakeup> {
    let mut guard = self.internal.lock();
    if guard.waiting_receivers.remove(id) || guard.queue.is_empty() {
      return None;
    }
    guard.waiting_receivers.pop_front()
  }

  /// Picks the next waiter for an item that a woken receiver declined.
  pub(crate) fn pass_on(&self) -> Option<Wakeup> {
    let mut guard = self.internal.lock();
    if guard.queue.is_empty() {
      return None;
    }
    guard.waiting_receivers.pop_front()
  }

  /// Irreversibly closes the queue. Buffered items stay receivable.
  ///
  /// Returns every waiter so the caller can wake them, or `None` if the
  /// queue was already closed.
  pub(crate) fn close(&self) -> Option<Vec<Wakeup>> {
    let mut guard = self.internal.lock();
    if guard.closed {
      return None;
    }
    guard.closed = true;
    Some(guard.waiting_receivers.drain().collect())
  }
}
