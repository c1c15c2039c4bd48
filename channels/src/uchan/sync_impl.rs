//! Implementation of the synchronous, blocking receive logic.

use super::core::UChanShared;
use crate::cancel::CancelSignal;
use crate::internal::fast_path::{Registration, TakeError};
use crate::internal::waiter::Wakeup;
use crate::sync_util;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Why a blocking receive stopped without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitError {
  Closed,
  TimedOut,
  Canceled,
}

/// The blocking receive shared by `recv`, `recv_timeout` and `recv_cancel`.
pub(crate) fn recv_blocking<T>(
  shared: &UChanShared<T>,
  deadline: Option<Instant>,
  cancel: Option<&CancelSignal>,
) -> Result<T, WaitError> {
  recv_claimed(shared, deadline, cancel, &|| true)
}

/// One non-blocking attempt; `None` when there is nothing to take yet.
fn probe<T>(shared: &UChanShared<T>, claim: &dyn Fn() -> bool) -> Option<Result<T, WaitError>> {
  match shared.take(claim) {
    Ok(value) => Some(Ok(value)),
    Err(TakeError::Closed) => Some(Err(WaitError::Closed)),
    Err(TakeError::Refused) => {
      // We may have been the waiter picked for this value.
      if let Some(next) = shared.fast_path.pass_on() {
        next.wake();
      }
      Some(Err(WaitError::Canceled))
    }
    Err(TakeError::Empty) => None,
  }
}

/// Blocking receive that only removes a value once `claim` agrees.
///
/// Probes first, so a queued value is returned even when the deadline has
/// already passed or the signal has already fired. Otherwise registers as a
/// waiter and parks until handed a value, the channel closes, the deadline
/// passes, or `cancel` fires. A refused claim ends the receive as `Canceled`
/// with the value left in the channel.
pub(crate) fn recv_claimed<T>(
  shared: &UChanShared<T>,
  deadline: Option<Instant>,
  cancel: Option<&CancelSignal>,
  claim: &dyn Fn() -> bool,
) -> Result<T, WaitError> {
  loop {
    // --- Phase 1: Attempt a non-blocking receive ---
    if let Some(outcome) = probe(shared, claim) {
      return outcome;
    }

    if cancel.is_some_and(CancelSignal::is_fired) {
      return Err(WaitError::Canceled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
      return Err(WaitError::TimedOut);
    }

    // --- Phase 2: Register as a waiter ---
    let done = Arc::new(AtomicBool::new(false));
    let waiter_id = match shared
      .fast_path
      .register(Wakeup::current_thread(done.clone()))
    {
      Registration::Parked(id) => id,
      Registration::Ready => continue,
    };
    // A send that raced past the probe may have spilled to the overflow
    // before seeing us; pull it across now that we are registered.
    shared.drain();

    let subscription = cancel.and_then(|signal| {
      signal
        .subscribe(Wakeup::current_thread(done.clone()))
        .map(|id| (signal, id))
    });

    // --- Phase 3: Wait ---
    let woken = sync_util::adaptive_wait_until(
      || done.load(Ordering::Acquire) || cancel.is_some_and(CancelSignal::is_fired),
      deadline,
    );

    if let Some((signal, id)) = subscription {
      signal.unsubscribe(id);
    }

    // --- Phase 4: Handle wake-up ---
    if cancel.is_some_and(CancelSignal::is_fired) {
      // Whatever was handed to us stays buffered for the next receiver.
      if let Some(next) = shared.fast_path.abandon(waiter_id) {
        next.wake();
      }
      return Err(WaitError::Canceled);
    }

    if !woken {
      if let Some(next) = shared.fast_path.abandon(waiter_id) {
        next.wake();
      }
      // One last look: a value that arrived with the deadline is still ours.
      return probe(shared, claim).unwrap_or(Err(WaitError::TimedOut));
    }

    // Handed a value or closed; loop to the top to take it.
    shared.fast_path.unregister(waiter_id);
  }
}
