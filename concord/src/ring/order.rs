//! Global acquisition order for ring resources.
//!
//! Every actor takes its lower-indexed resource first. For actors `0..n-1`
//! that is their own slot; the last actor's pair wraps to `{n-1, 0}`, so it
//! takes resource `0` first. Resource `n-1` is therefore never anyone's first
//! request, and the wait-for graph cannot close into a cycle.
//!
//! [`acquisition_order`] is the only place this rule is written down.

use super::{ActorId, ResourceId};

/// The two resources an actor needs, in the order it must take them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcquisitionOrder {
    /// Taken first, released last.
    pub first: ResourceId,
    /// Taken second, released first.
    pub second: ResourceId,
}

/// Maps `actor` in a ring of `actors` to its ordered resource pair.
///
/// `actors` must be at least 2 and `actor` below it; [`super::ResourceRing`]
/// checks both before calling.
#[must_use]
pub const fn acquisition_order(actor: ActorId, actors: usize) -> AcquisitionOrder {
    let own = actor.index();
    let next = (own + 1) % actors;
    if own == actors - 1 {
        AcquisitionOrder {
            first: ResourceId::new(next),
            second: ResourceId::new(own),
        }
    } else {
        AcquisitionOrder {
            first: ResourceId::new(own),
            second: ResourceId::new(next),
        }
    }
}
