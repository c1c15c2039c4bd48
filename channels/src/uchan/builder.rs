use super::core::UChanShared;
use super::UnboundedChannel;
use crate::error::BuildError;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Fast path capacity used by [`UnboundedChannel::default`] and a fresh builder.
pub const DEFAULT_FAST_PATH_CAPACITY: usize = 32;

/// Largest fast path capacity [`ChannelBuilder::build`] accepts.
///
/// Values beyond the fast path live in the unbounded overflow anyway, so a
/// larger fast path only costs memory.
pub const MAX_FAST_PATH_CAPACITY: usize = 1 << 20;

/// A builder for creating [`UnboundedChannel`] instances.
///
/// ```
/// use fibre_uchan::ChannelBuilder;
///
/// let chan = ChannelBuilder::<String>::new()
///   .fast_path_capacity(8)
///   .name("jobs")
///   .build()
///   .unwrap();
/// assert_eq!(chan.capacity(), 8);
/// assert_eq!(chan.name(), Some("jobs"));
/// ```
pub struct ChannelBuilder<T> {
  fast_path_capacity: usize,
  name: Option<String>,
  _value_marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for ChannelBuilder<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChannelBuilder")
      .field("fast_path_capacity", &self.fast_path_capacity)
      .field("name", &self.name)
      .finish()
  }
}

impl<T> Default for ChannelBuilder<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> ChannelBuilder<T> {
  /// Creates a builder with [`DEFAULT_FAST_PATH_CAPACITY`] and no name.
  pub fn new() -> Self {
    ChannelBuilder {
      fast_path_capacity: DEFAULT_FAST_PATH_CAPACITY,
      name: None,
      _value_marker: PhantomData,
    }
  }

  /// Sets the capacity L of the bounded fast path.
  ///
  /// `0` is valid: values then wait in the overflow until a receiver asks.
  pub fn fast_path_capacity(mut self, capacity: usize) -> Self {
    self.fast_path_capacity = capacity;
    self
  }

  /// Names the channel. The name tags log records and the threads spawned by
  /// `recv_as_event`.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Validates the configuration and creates the channel.
  pub fn build(self) -> Result<UnboundedChannel<T>, BuildError> {
    if self.fast_path_capacity > MAX_FAST_PATH_CAPACITY {
      return Err(BuildError::CapacityTooLarge {
        requested: self.fast_path_capacity,
        max: MAX_FAST_PATH_CAPACITY,
      });
    }
    tracing::debug!(
      channel = self.name.as_deref().unwrap_or(""),
      fast_path_capacity = self.fast_path_capacity,
      "unbounded channel created"
    );
    Ok(UnboundedChannel {
      shared: Arc::new(UChanShared::new(self.fast_path_capacity, self.name)),
    })
  }
}
