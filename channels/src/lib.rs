//! An unbounded, never-blocking-send channel for Rust.
//!
//! Producers enqueue values without ever stalling. Consumers can block,
//! block with a timeout, block until a [`CancelSignal`] fires, `.await`, or
//! obtain a [`ReceiverHandle`] to wait on the channel alongside other event
//! sources. Shutdown is drain-then-close: every value accepted before
//! [`UnboundedChannel::close`] is still delivered.
//!
//! ```
//! use fibre_uchan::{RecvTimeoutError, UnboundedChannel};
//! use std::time::Duration;
//!
//! let chan = UnboundedChannel::new(16);
//! chan.send("hello").unwrap();
//! assert_eq!(chan.recv_timeout(Duration::ZERO), Ok("hello"));
//! assert_eq!(
//!   chan.recv_timeout(Duration::from_millis(5)),
//!   Err(RecvTimeoutError::TimedOut)
//! );
//! ```

pub mod cancel;
pub mod error;
pub mod uchan;

// Internal utilities - not part of public API but exposed for crate use
mod async_util;
mod internal;
mod sync_util;

pub use cancel::CancelSignal;
pub use error::{
  BuildError, CloseError, RecvCancelError, RecvError, RecvTimeoutError, SendError, TryRecvError,
};
pub use uchan::{channel, ChannelBuilder, ReceiverHandle, UnboundedChannel};

