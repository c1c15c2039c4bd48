// src/error.rs

use core::fmt;

/// Error returned by `send` and `send_and_close` when the channel has been closed.
///
/// The rejected value is handed back to the caller.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
  /// Consumes the error, returning the value that could not be sent.
  #[inline]
  pub fn into_inner(self) -> T {
    self.0
  }
}

// Written by hand so that `T` does not need to be `Debug`.
impl<T> fmt::Debug for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SendError(..)")
  }
}

impl<T> fmt::Display for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("sending on a closed channel")
  }
}

impl<T> std::error::Error for SendError<T> {}

/// Error returned by the internal `try_send` of the fast path queue.
#[derive(PartialEq, Eq, Clone)]
pub(crate) enum TrySendError<T> {
  /// The queue is at capacity and no receiver is waiting.
  Full(T),
  /// The queue has been irreversibly closed.
  Closed(T),
}

impl<T> fmt::Debug for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => write!(f, "TrySendError::Full(..)"),
      TrySendError::Closed(_) => write!(f, "TrySendError::Closed(..)"),
    }
  }
}

/// Error returned by `try_recv` when no value could be taken immediately.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// Nothing is buffered right now, but the channel is still open.
  Empty,
  /// The channel is closed and every buffered value has been received.
  Closed,
}
impl std::error::Error for TryRecvError {}
impl fmt::Display for TryRecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryRecvError::Empty => write!(f, "channel empty"),
      TryRecvError::Closed => write!(f, "channel closed and drained"),
    }
  }
}

/// Error returned by blocking and async receives.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
  /// The channel is closed and every buffered value has been received.
  Closed,
}
impl std::error::Error for RecvError {}
impl fmt::Display for RecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecvError::Closed => write!(f, "channel closed and drained"),
    }
  }
}

/// Error returned by `recv_timeout` operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvTimeoutError {
  /// The channel is closed and every buffered value has been received.
  Closed,
  /// The timeout elapsed before a value could be received.
  TimedOut,
}

impl std::error::Error for RecvTimeoutError {}
impl fmt::Display for RecvTimeoutError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecvTimeoutError::Closed => write!(f, "channel closed and drained"),
      RecvTimeoutError::TimedOut => write!(f, "receive operation timed out"),
    }
  }
}

impl From<RecvError> for RecvTimeoutError {
  fn from(_: RecvError) -> Self {
    RecvTimeoutError::Closed
  }
}

/// Error returned by `recv_cancel` operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvCancelError {
  /// The channel is closed and every buffered value has been received.
  Closed,
  /// The caller's cancel signal fired before a value arrived.
  Canceled,
}

impl std::error::Error for RecvCancelError {}
impl fmt::Display for RecvCancelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecvCancelError::Closed => write!(f, "channel closed and drained"),
      RecvCancelError::Canceled => write!(f, "receive operation canceled"),
    }
  }
}

impl From<RecvError> for RecvCancelError {
  fn from(_: RecvError) -> Self {
    RecvCancelError::Closed
  }
}

/// Error returned when attempting to close an already closed channel.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CloseError;
impl std::error::Error for CloseError {}
impl fmt::Display for CloseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "channel is already closed")
  }
}

/// Errors that can occur when building a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The requested fast path capacity exceeds `MAX_FAST_PATH_CAPACITY`.
  CapacityTooLarge {
    /// Capacity passed to the builder.
    requested: usize,
    /// Largest capacity the builder accepts.
    max: usize,
  },
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::CapacityTooLarge { requested, max } => write!(
        f,
        "fast path capacity {} exceeds the maximum of {}",
        requested, max
      ),
    }
  }
}

impl std::error::Error for BuildError {}
