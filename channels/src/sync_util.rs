//! Utilities for synchronous blocking and parking.
//!
//! Waiters never trust a single unpark: every wait re-checks its condition,
//! so spurious wakeups and stale unparks from an earlier wait are harmless.

use std::thread;
use std::time::{Duration, Instant};

const SPIN_ROUNDS: usize = 10;
const YIELD_ROUNDS: usize = 20;

/// Emits a CPU instruction that signals the processor that it is in a spin loop.
#[inline(always)]
fn spin_hint() {
  std::hint::spin_loop();
}

/// Parks the current thread for a given duration.
#[inline]
pub(crate) fn park_thread_timeout(duration: Duration) {
  thread::park_timeout(duration);
}

/// Unparks the given thread.
#[inline]
pub(crate) fn unpark_thread(thread: &thread::Thread) {
  thread.unpark();
}

/// Time left until `deadline`, or `None` once it has passed.
#[inline]
pub(crate) fn remaining(deadline: Instant) -> Option<Duration> {
  deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero())
}

/// An adaptive wait strategy that starts with spinning, then yields, then parks.
///
/// Returns `true` once `cond` holds, or `false` if `deadline` passed first.
/// With no deadline the thread only leaves the blocking phase through an
/// `unpark()` that makes `cond` true.
pub(crate) fn adaptive_wait_until<F>(cond: F, deadline: Option<Instant>) -> bool
where
  F: Fn() -> bool,
{
  // 1. Spinning Phase
  for _ in 0..SPIN_ROUNDS {
    if cond() {
      return true;
    }
    spin_hint();
  }

  // 2. Yielding Phase
  for _ in 0..YIELD_ROUNDS {
    if cond() {
      return true;
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
      return false;
    }
    thread::yield_now();
  }

  // 3. Blocking Phase
  loop {
    if cond() {
      return true;
    }
    match deadline {
      None => thread::park(),
      Some(d) => match remaining(d) {
        Some(left) => park_thread_timeout(left),
        None => return cond(),
      },
    }
  }
}
