//! A single ring resource and the RAII hold on it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ActorId;

const VACANT: usize = usize::MAX;

/// One indivisible shared resource: a binary lock plus bookkeeping.
///
/// `holder` and `occupancy` are written only while `lock` is held, and are
/// reset before it is released. They exist so callers can observe mutual
/// exclusion from outside.
#[derive(Debug)]
pub(crate) struct Resource {
    lock: Mutex<()>,
    holder: AtomicUsize,
    occupancy: AtomicUsize,
}

impl Resource {
    pub(crate) const fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            holder: AtomicUsize::new(VACANT),
            occupancy: AtomicUsize::new(0),
        }
    }

    /// Blocks until the resource is free, then takes it for `actor`.
    pub(crate) fn acquire(&self, actor: ActorId) -> Held<'_> {
        // A poisoned lock only means a previous holder panicked mid-work;
        // the resource itself carries no data to repair.
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.holder.store(actor.index(), Ordering::Release);
        self.occupancy.fetch_add(1, Ordering::AcqRel);
        Held {
            resource: self,
            _guard: guard,
        }
    }

    pub(crate) fn holder(&self) -> Option<ActorId> {
        match self.holder.load(Ordering::Acquire) {
            VACANT => None,
            id => Some(ActorId::new(id)),
        }
    }

    pub(crate) fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Acquire)
    }
}

/// Exclusive hold on a [`Resource`]; dropping it releases the resource.
#[must_use = "the resource is released as soon as this is dropped"]
pub(crate) struct Held<'a> {
    resource: &'a Resource,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        // Runs before `_guard` unlocks.
        self.resource.occupancy.fetch_sub(1, Ordering::AcqRel);
        self.resource.holder.store(VACANT, Ordering::Release);
    }
}
