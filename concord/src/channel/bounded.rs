//! Semaphore-guarded bounded buffer.
//!
//! ```text
//! produce: wait(empty) ─► lock(guard) ─ slots[head] = item, head += 1 ─► signal(full)
//! consume: wait(full)  ─► lock(guard) ─ item = slots[tail], tail += 1 ─► signal(empty)
//! ```
//!
//! `empty` and `full` reserve capacity: a producer owns a vacant slot once it
//! has taken an `empty` permit, a consumer owns an occupied slot once it has
//! taken a `full` permit. `guard` serializes cursor movement. Neither is enough
//! alone: permits do not stop two producers from reading the same `head`, and
//! the guard does not stop a producer from overrunning a full buffer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::occupancy::Occupancy;
use super::{ChannelError, RecvError, SendError};
use crate::sync::Semaphore;
use crate::trace::{debug, trace};

/// State behind the guard.
struct Cursors<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    closed: bool,
}

impl<T> Cursors<T> {
    fn view(&self) -> Occupancy<'_, T> {
        Occupancy {
            slots: &self.slots,
            head: self.head,
            tail: self.tail,
        }
    }
}

/// Returns one permit to a semaphore when dropped, including on unwind.
struct SignalOnDrop<'a>(&'a Semaphore);

impl Drop for SignalOnDrop<'_> {
    fn drop(&mut self) {
        self.0.signal();
    }
}

/// Fixed-capacity FIFO shared by any number of producers and consumers.
///
/// Share it by reference (scoped threads) or through an `Arc`.
pub struct BoundedChannel<T> {
    guard: Mutex<Cursors<T>>,
    /// Vacant slots.
    empty: Semaphore,
    /// Occupied slots.
    full: Semaphore,
}

impl<T> BoundedChannel<T> {
    /// Creates an empty channel with `capacity` slots.
    ///
    /// # Errors
    ///
    /// [`ChannelError::ZeroCapacity`] if `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::ZeroCapacity);
        }

        let slots = std::iter::repeat_with(|| None).take(capacity).collect();

        debug!(capacity, "channel created");

        Ok(Self {
            guard: Mutex::new(Cursors {
                slots,
                head: 0,
                tail: 0,
                closed: false,
            }),
            empty: Semaphore::new(capacity),
            full: Semaphore::new(0),
        })
    }

    // A panic while the guard is held cannot leave a cursor half-advanced:
    // every mutation is a single store, and the permit for a moved cursor is
    // returned by `SignalOnDrop` during unwinding.
    fn lock(&self) -> MutexGuard<'_, Cursors<T>> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues `item`, blocking while the channel is full.
    ///
    /// # Errors
    ///
    /// Hands `item` back if the channel is closed.
    pub fn produce(&self, item: T) -> Result<(), SendError<T>> {
        self.produce_inspect(item, |_, _| ())
    }

    /// Like [`Self::produce`], then calls `inspect` with the slot written and
    /// a view of the buffer, before the guard is released.
    ///
    /// # Errors
    ///
    /// Hands `item` back if the channel is closed.
    pub fn produce_inspect<R>(
        &self,
        item: T,
        inspect: impl FnOnce(usize, &Occupancy<'_, T>) -> R,
    ) -> Result<R, SendError<T>> {
        if self.empty.wait().is_err() {
            return Err(SendError(item));
        }

        let mut cursors = self.lock();
        if cursors.closed {
            drop(cursors);
            self.empty.signal();
            return Err(SendError(item));
        }

        let slot = cursors.head;
        debug_assert!(cursors.slots[slot].is_none(), "slot {slot} overwritten");
        cursors.slots[slot] = Some(item);
        cursors.head = (slot + 1) % cursors.slots.len();

        // Declared after `cursors`, so `full` is signalled before the guard is
        // released, even if `inspect` unwinds. close() can never see an
        // enqueued item whose permit is still pending.
        let _written = SignalOnDrop(&self.full);

        trace!(slot, head = cursors.head, "produced");
        Ok(inspect(slot, &cursors.view()))
    }

    /// Dequeues the oldest item, blocking while the channel is empty.
    ///
    /// # Errors
    ///
    /// [`RecvError::Closed`] once the channel is closed and drained. Without
    /// [`Self::close`] this blocks forever on an empty channel.
    pub fn consume(&self) -> Result<T, RecvError> {
        self.consume_inspect(|_, _, _| ()).map(|(item, ())| item)
    }

    /// Like [`Self::consume`], then calls `inspect` with the slot read, the
    /// item and a view of the buffer, before the guard is released.
    ///
    /// # Errors
    ///
    /// [`RecvError::Closed`] once the channel is closed and drained.
    pub fn consume_inspect<R>(
        &self,
        inspect: impl FnOnce(usize, &T, &Occupancy<'_, T>) -> R,
    ) -> Result<(T, R), RecvError> {
        self.full.wait().map_err(|_| RecvError::Closed)?;

        // Declared before `cursors`, so `empty` is signalled after the guard is
        // released. If `inspect` unwinds the item is dropped but its slot is
        // still handed back.
        let _vacated = SignalOnDrop(&self.empty);

        let mut cursors = self.lock();
        let slot = cursors.tail;
        // A `full` permit always refers to a written slot.
        let Some(item) = cursors.slots[slot].take() else {
            unreachable!("full permit taken for vacant slot {slot}");
        };
        cursors.tail = (slot + 1) % cursors.slots.len();

        trace!(slot, tail = cursors.tail, "consumed");
        let inspected = inspect(slot, &item, &cursors.view());

        Ok((item, inspected))
    }

    /// Stops the channel.
    ///
    /// Pending and future `produce` calls fail. Consumers keep receiving what
    /// was already enqueued, then get [`RecvError::Closed`].
    pub fn close(&self) {
        let mut cursors = self.lock();
        if cursors.closed {
            return;
        }
        cursors.closed = true;
        self.empty.close();
        self.full.close();
        drop(cursors);

        debug!("channel closed");
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Unreserved vacant slots (the `empty` count).
    #[must_use]
    pub fn available(&self) -> usize {
        self.empty.permits()
    }

    /// Unclaimed occupied slots (the `full` count).
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.full.permits()
    }

    /// Renders the buffer with `f` under the guard.
    pub fn with_occupancy<R>(&self, f: impl FnOnce(&Occupancy<'_, T>) -> R) -> R {
        f(&self.lock().view())
    }
}

impl<T> std::fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("occupied", &self.occupied())
            .field("closed", &self.is_closed())
            .finish()
    }
}
