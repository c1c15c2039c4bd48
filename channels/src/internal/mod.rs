pub(crate) mod fast_path;
pub(crate) mod overflow;
pub(crate) mod waiter;
