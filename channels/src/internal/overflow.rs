//! The unbounded FIFO of values that did not fit into the fast path.
//!
//! All mutation happens through the guard returned by `OverflowBuffer::lock`.
//! Holding that guard is what linearizes sends: the fast path only ever
//! receives new items from a thread holding it.

use super::fast_path::FastPath;
use super::waiter::Wakeup;
use crate::error::TrySendError;

use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;

pub(crate) struct OverflowBuffer<T> {
  pending: Mutex<VecDeque<T>>,
}

impl<T> fmt::Debug for OverflowBuffer<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OverflowBuffer")
      .field("len", &self.len())
      .finish()
  }
}

impl<T> OverflowBuffer<T> {
  pub(crate) fn new() -> Self {
    OverflowBuffer {
      pending: Mutex::new(VecDeque::new()),
    }
  }

  #[inline]
  pub(crate) fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
    self.pending.lock()
  }

  pub(crate) fn len(&self) -> usize {
    self.pending.lock().len()
  }
}

/// Moves values from the front of `pending` into `fast_path` until either
/// `pending` is empty or the fast path refuses one.
///
/// A refused value goes back to the front, so order is unchanged. Wakeups for
/// receivers that were handed a value are appended to `wakeups`. Returns
/// `true` if `pending` ended up empty.
pub(crate) fn flush_front<T>(
  pending: &mut VecDeque<T>,
  fast_path: &FastPath<T>,
  wakeups: &mut Vec<Wakeup>,
) -> bool {
  while let Some(item) = pending.pop_front() {
    match fast_path.try_send(item) {
      Ok(wakeup) => wakeups.extend(wakeup),
      Err(TrySendError::Full(item)) | Err(TrySendError::Closed(item)) => {
        pending.push_front(item);
        return false;
      }
    }
  }
  true
}
