//! A one-shot, broadcast cancellation signal.
//!
//! `CancelSignal` is a cheap handle: clones share the same state, and firing
//! any clone cancels every receive currently racing against it. Once fired a
//! signal stays fired.
//!
//! # Examples
//!
//! ```
//! use fibre_uchan::{CancelSignal, RecvCancelError, UnboundedChannel};
//! use std::thread;
//! use std::time::Duration;
//!
//! let chan = UnboundedChannel::<u32>::new(4);
//! let signal = CancelSignal::new();
//!
//! let canceller = {
//!   let signal = signal.clone();
//!   thread::spawn(move || {
//!     thread::sleep(Duration::from_millis(20));
//!     signal.fire();
//!   })
//! };
//!
//! assert_eq!(chan.recv_cancel(&signal), Err(RecvCancelError::Canceled));
//! canceller.join().unwrap();
//! ```

use crate::internal::waiter::{wake_all, WaiterId, WaiterList, Wakeup};

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct CancelInner {
  fired: AtomicBool,
  subscribers: Mutex<WaiterList>,
}

/// A one-shot signal used to cancel `recv_cancel` and receiver handles.
#[derive(Clone)]
pub struct CancelSignal {
  inner: Arc<CancelInner>,
}

impl fmt::Debug for CancelSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CancelSignal")
      .field("fired", &self.is_fired())
      .finish_non_exhaustive()
  }
}

impl Default for CancelSignal {
  fn default() -> Self {
    Self::new()
  }
}

impl CancelSignal {
  /// Creates a signal that has not fired.
  pub fn new() -> Self {
    CancelSignal {
      inner: Arc::new(CancelInner {
        fired: AtomicBool::new(false),
        subscribers: Mutex::new(WaiterList::new()),
      }),
    }
  }

  /// Fires the signal, waking every receive waiting on it.
  ///
  /// Returns `true` only for the call that actually fired it.
  pub fn fire(&self) -> bool {
    if self.inner.fired.swap(true, Ordering::AcqRel) {
      return false;
    }
    let subscribers: Vec<Wakeup> = self.inner.subscribers.lock().drain().collect();
    tracing::trace!(subscribers = subscribers.len(), "cancel signal fired");
    wake_all(subscribers);
    true
  }

  /// Returns `true` once the signal has fired.
  #[inline]
  pub fn is_fired(&self) -> bool {
    self.inner.fired.load(Ordering::Acquire)
  }

  /// Registers a wakeup to run when the signal fires.
  ///
  /// Returns `None` if it has already fired; nothing is registered then.
  pub(crate) fn subscribe(&self, wakeup: Wakeup) -> Option<WaiterId> {
    let mut subscribers = self.inner.subscribers.lock();
    // Checked under the lock: `fire` flips the flag before taking it.
    if self.is_fired() {
      return None;
    }
    Some(subscribers.push(wakeup))
  }

  pub(crate) fn unsubscribe(&self, id: WaiterId) {
    self.inner.subscribers.lock().remove(id);
  }
}
