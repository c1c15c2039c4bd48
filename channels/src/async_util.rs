//! Async plumbing shared by the channel futures and the delivery cell.

// The futures-util implementation handles the register/wake race for us.
pub(crate) use futures_util::task::AtomicWaker;
