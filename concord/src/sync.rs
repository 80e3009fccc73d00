//! Blocking synchronization primitives shared by the ring and the channel.

pub mod semaphore;

pub use semaphore::{Closed, Semaphore};
