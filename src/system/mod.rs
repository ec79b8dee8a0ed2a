//! Process-wide shared state: the reset and shutdown flags.

pub mod shared_flags;

pub use shared_flags::SharedFlags;
