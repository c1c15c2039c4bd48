use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Waker;
use std::thread::{self, Thread};

use crate::sync_util;

/// Identifies a registered waiter so it can later be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct WaiterId(pub(crate) u64);

/// How to wake a parked receiver.
///
/// Wakeups are collected while a lock is held and fired after it is released.
pub(crate) enum Wakeup {
  /// A parked thread. `done` is set before the unpark so the thread's
  /// adaptive wait can observe it without re-parking.
  Thread { thread: Thread, done: Arc<AtomicBool> },
  /// A pending future.
  Task(Waker),
}

impl Wakeup {
  /// A thread wakeup for the calling thread.
  pub(crate) fn current_thread(done: Arc<AtomicBool>) -> Self {
    Wakeup::Thread {
      thread: thread::current(),
      done,
    }
  }

  pub(crate) fn wake(self) {
    match self {
      Wakeup::Thread { thread, done } => {
        done.store(true, Ordering::Release);
        sync_util::unpark_thread(&thread);
      }
      Wakeup::Task(waker) => waker.wake(),
    }
  }
}

impl fmt::Debug for Wakeup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Wakeup::Thread { thread, .. } => f.debug_tuple("Wakeup::Thread").field(&thread.id()).finish(),
      Wakeup::Task(_) => f.write_str("Wakeup::Task(..)"),
    }
  }
}

/// Fires every collected wakeup. Call only after dropping all locks.
#[inline]
pub(crate) fn wake_all<I>(wakeups: I)
where
  I: IntoIterator<Item = Wakeup>,
{
  for wakeup in wakeups {
    wakeup.wake();
  }
}

/// Hands out `WaiterId`s and keeps registered waiters in arrival order.
#[derive(Debug, Default)]
pub(crate) struct WaiterList {
  next_id: u64,
  entries: std::collections::VecDeque<(WaiterId, Wakeup)>,
}

impl WaiterList {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn push(&mut self, wakeup: Wakeup) -> WaiterId {
    let id = WaiterId(self.next_id);
    self.next_id = self.next_id.wrapping_add(1);
    self.entries.push_back((id, wakeup));
    id
  }

  pub(crate) fn pop_front(&mut self) -> Option<Wakeup> {
    self.entries.pop_front().map(|(_, wakeup)| wakeup)
  }

  /// Removes the waiter with `id`. Returns `false` if it was already popped.
  pub(crate) fn remove(&mut self, id: WaiterId) -> bool {
    match self.entries.iter().position(|(entry_id, _)| *entry_id == id) {
      Some(index) => {
        self.entries.remove(index);
        true
      }
      None => false,
    }
  }

  /// Replaces the waker of a still-registered task waiter.
  pub(crate) fn update_waker(&mut self, id: WaiterId, waker: &Waker) -> bool {
    for (entry_id, wakeup) in self.entries.iter_mut() {
      if *entry_id == id {
        if let Wakeup::Task(current) = wakeup {
          if !current.will_wake(waker) {
            *current = waker.clone();
          }
        }
        return true;
      }
    }
    false
  }

  pub(crate) fn drain(&mut self) -> impl Iterator<Item = Wakeup> + '_ {
    self.entries.drain(..).map(|(_, wakeup)| wakeup)
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }
}
