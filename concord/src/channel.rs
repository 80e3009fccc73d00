//! Bounded producer/consumer handoff.
//!
//! A [`BoundedChannel`] is a fixed ring of slots with a write cursor (`head`)
//! and a read cursor (`tail`). Two counting semaphores track vacant and
//! occupied slots; a mutex guards the cursors and slot contents.
//!
//! # Ordering
//!
//! Items come out in the order they went in. With several producers the
//! interleaving of their items is whatever order they won the guard in.
//!
//! # Termination
//!
//! Consumers block on an empty channel indefinitely. Callers that need them to
//! stop call [`BoundedChannel::close`]: queued items are still delivered,
//! after which [`BoundedChannel::consume`] returns [`RecvError::Closed`].
//!
//! # Example
//!
//! ```
//! use concord::channel::BoundedChannel;
//!
//! let channel = BoundedChannel::new(5)?;
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         for i in 0..6 {
//!             channel.produce(i).unwrap();
//!         }
//!     });
//!     for i in 0..6 {
//!         assert_eq!(channel.consume(), Ok(i));
//!     }
//! });
//! # Ok::<(), concord::channel::ChannelError>(())
//! ```

mod bounded;
mod occupancy;

use std::fmt;

pub use bounded::BoundedChannel;
pub use occupancy::Occupancy;

/// Errors from building a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// A channel needs at least one slot.
    #[error("channel capacity must be greater than 0")]
    ZeroCapacity,
}

/// Returned by [`BoundedChannel::produce`] on a closed channel. Carries the
/// item that could not be sent.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Recovers the unsent item.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sending on a closed channel")
    }
}

impl<T> std::error::Error for SendError<T> {}

/// Returned by [`BoundedChannel::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecvError {
    /// The channel is closed and no items remain.
    #[error("receiving on a closed and empty channel")]
    Closed,
}

/// Shape and pacing of a producer/consumer run.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Slots in the buffer.
    pub capacity: usize,
    /// Number of producer threads.
    pub producers: usize,
    /// Items each producer sends before stopping.
    pub items_per_producer: u32,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Pause before each item is produced.
    pub produce: crate::Pacing,
    /// Pause after each item is consumed.
    pub consume: crate::Pacing,
}

impl ChannelConfig {
    /// Item a producer emits as its `sequence`th value: `producer * 100 + sequence`.
    ///
    /// Unique while `items_per_producer <= 100`.
    #[must_use]
    pub const fn item(producer: usize, sequence: u32) -> u64 {
        producer as u64 * 100 + sequence as u64
    }

    /// Total items all producers will send.
    #[must_use]
    pub const fn total_items(&self) -> u64 {
        self.producers as u64 * self.items_per_producer as u64
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            producers: 2,
            items_per_producer: 10,
            consumers: 3,
            produce: crate::Pacing::seconds(0, 1),
            consume: crate::Pacing::seconds(1, 3),
        }
    }
}
