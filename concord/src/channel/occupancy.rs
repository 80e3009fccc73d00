//! Snapshot view of a bounded channel's slots and cursors.

use std::fmt;

/// Read-only view of a channel's slots and cursors.
///
/// Only handed out while the channel's guard is held, so it is always a
/// consistent picture of the buffer right after one produce or consume.
pub struct Occupancy<'a, T> {
    pub(crate) slots: &'a [Option<T>],
    pub(crate) head: usize,
    pub(crate) tail: usize,
}

impl<T> Occupancy<'_, T> {
    /// Next slot a producer will write.
    #[must_use]
    pub const fn head(&self) -> usize {
        self.head
    }

    /// Next slot a consumer will read.
    #[must_use]
    pub const fn tail(&self) -> usize {
        self.tail
    }

    /// Number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently holding an item.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Slot contents in index order.
    pub fn slots(&self) -> impl Iterator<Item = Option<&T>> {
        self.slots.iter().map(Option::as_ref)
    }
}

/// Renders `[ O:100 101 I:- - - ]`: `I` marks `head`, `O` marks `tail`,
/// vacant slots print as `-`.
impl<T: fmt::Display> fmt::Display for Occupancy<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, slot) in self.slots.iter().enumerate() {
            f.write_str(" ")?;
            match (i == self.head, i == self.tail) {
                (true, true) => f.write_str("IO:")?,
                (true, false) => f.write_str("I:")?,
                (false, true) => f.write_str("O:")?,
                (false, false) => {}
            }
            match slot {
                Some(item) => write!(f, "{item}")?,
                None => f.write_str("-")?,
            }
        }
        f.write_str(" ]")
    }
}

impl<T: fmt::Debug> fmt::Debug for Occupancy<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Occupancy")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("slots", &self.slots)
            .finish()
    }
}
