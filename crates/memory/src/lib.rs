//! Memory store implementations for chatplug.
//!
//! The host owns memory persistence; these stores stand in for it in
//! tests and in the local CLI driver.

pub mod noop;
pub mod in_memory;

pub use noop::NoopStore;
pub use in_memory::InMemoryStore;
