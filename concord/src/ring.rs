//! Dining-philosophers ring with deadlock avoidance by resource ordering.
//!
//! # Topology
//!
//! ```text
//!            r0
//!      a4          a0
//!   r4                r1
//!      a3          a1
//!        r3   a2   r2
//! ```
//!
//! `N` actors sit in a cycle with one resource between each pair of
//! neighbours. Actor `i` needs resources `i` and `(i + 1) % N` at the same time
//! to do a unit of work.
//!
//! # Deadlock avoidance
//!
//! If every actor grabbed its own resource first, all `N` could hold one and
//! wait forever on the next. Instead every actor takes the lower-indexed of its
//! two resources first (see [`acquisition_order`]); the last actor's pair wraps
//! to `{N-1, 0}` and so starts with `0`. Nobody requests `N-1` first, so the
//! wait-for graph has no cycle and some actor can always finish.
//!
//! Only progress is guaranteed. There is no fairness between actors and no
//! bound on how long a particular actor waits.
//!
//! # Ownership
//!
//! The ring owns the resource arena. Actors are just an [`ActorId`] plus a
//! shared `&ResourceRing`; [`ResourceRing::run`] hands both to scoped threads.
//!
//! # Example
//!
//! ```
//! use concord::ring::{ResourceRing, RingConfig};
//! use concord::Pacing;
//!
//! let ring = ResourceRing::new(RingConfig {
//!     actors: 5,
//!     rounds: 3,
//!     think: Pacing::None,
//!     work: Pacing::None,
//! })?;
//!
//! let report = ring.run(|_event| {})?;
//! assert!(report.actors.iter().all(|a| a.rounds == 3));
//! # Ok::<(), concord::ring::RingError>(())
//! ```

pub mod order;
mod resource;

use std::fmt;
use std::thread;
use std::time::Duration;

use minstant::Instant;

use crate::pacing::Pacing;
use crate::trace::{debug, trace, warn};

pub use order::{AcquisitionOrder, acquisition_order};
use resource::Resource;

/// Position of an actor in the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ActorId(usize);

impl ActorId {
    /// Creates an actor identifier.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in the ring.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a resource in the ring's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ResourceId(usize);

impl ResourceId {
    /// Creates a resource identifier.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape and pacing of a ring. Fixed once the ring is built.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Number of actors, and therefore of resources. At least 2.
    pub actors: usize,
    /// Acquire/work/release cycles each actor performs.
    pub rounds: u32,
    /// Pause before requesting resources.
    pub think: Pacing,
    /// Pause while holding both resources.
    pub work: Pacing,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            actors: 5,
            rounds: 3,
            think: Pacing::Fixed(Duration::from_secs(1)),
            work: Pacing::Fixed(Duration::from_secs(1)),
        }
    }
}

/// Errors from building or driving a ring.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// A ring needs two resources per actor, so at least two actors.
    #[error("a ring needs at least 2 actors, got {actors}")]
    TooFewActors {
        /// Requested actor count.
        actors: usize,
    },
    /// Actor index outside the ring.
    #[error("actor {actor} does not exist in a ring of {actors}")]
    UnknownActor {
        /// Requested actor.
        actor: ActorId,
        /// Ring size.
        actors: usize,
    },
    /// OS refused to start an actor thread.
    #[error("failed to spawn actor {actor}: {source}")]
    Spawn {
        /// Actor whose thread failed to start.
        actor: ActorId,
        /// Underlying error.
        source: std::io::Error,
    },
    /// An actor thread panicked before finishing its rounds.
    #[error("actor {actor} panicked")]
    ActorPanicked {
        /// The actor that panicked.
        actor: ActorId,
    },
}

/// Progress reported by an actor. `round` counts from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingEvent {
    /// About to think.
    Thinking {
        /// Reporting actor.
        actor: ActorId,
        /// Current round.
        round: u32,
    },
    /// About to block on its first resource.
    AwaitingFirst {
        /// Reporting actor.
        actor: ActorId,
        /// Current round.
        round: u32,
        /// Resource being requested.
        resource: ResourceId,
    },
    /// Holds the first resource, about to block on the second.
    AwaitingSecond {
        /// Reporting actor.
        actor: ActorId,
        /// Current round.
        round: u32,
        /// Resource being requested.
        resource: ResourceId,
    },
    /// Holds both resources and is starting its unit of work.
    Working {
        /// Reporting actor.
        actor: ActorId,
        /// Current round.
        round: u32,
        /// Resources held.
        held: AcquisitionOrder,
    },
    /// Released both resources.
    Finished {
        /// Reporting actor.
        actor: ActorId,
        /// Completed round.
        round: u32,
    },
}

impl RingEvent {
    /// The actor that emitted this event.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        match *self {
            Self::Thinking { actor, .. }
            | Self::AwaitingFirst { actor, .. }
            | Self::AwaitingSecond { actor, .. }
            | Self::Working { actor, .. }
            | Self::Finished { actor, .. } => actor,
        }
    }
}

/// Outcome of one actor's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorReport {
    /// The actor.
    pub actor: ActorId,
    /// Rounds completed.
    pub rounds: u32,
    /// Total time spent blocked on resources.
    pub waited: Duration,
}

/// Outcome of [`ResourceRing::run`].
#[derive(Debug, Clone)]
pub struct RingReport {
    /// One entry per actor, in actor order.
    pub actors: Vec<ActorReport>,
    /// Wall time from first spawn to last join.
    pub elapsed: Duration,
}

impl RingReport {
    /// Sum of completed rounds across actors.
    #[must_use]
    pub fn total_rounds(&self) -> u64 {
        self.actors.iter().map(|a| u64::from(a.rounds)).sum()
    }
}

/// A cycle of actors sharing one resource between each pair of neighbours.
#[derive(Debug)]
pub struct ResourceRing {
    config: RingConfig,
    resources: Box<[Resource]>,
}

impl ResourceRing {
    /// Builds a ring with every resource available.
    ///
    /// # Errors
    ///
    /// [`RingError::TooFewActors`] if `config.actors < 2`.
    pub fn new(config: RingConfig) -> Result<Self, RingError> {
        if config.actors < 2 {
            return Err(RingError::TooFewActors {
                actors: config.actors,
            });
        }

        let resources = (0..config.actors).map(|_| Resource::new()).collect();

        debug!(actors = config.actors, rounds = config.rounds, "ring created");

        Ok(Self { config, resources })
    }

    /// Number of actors (and resources).
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Always `false`; a ring has at least two actors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The order in which `actor` takes its two resources.
    ///
    /// # Errors
    ///
    /// [`RingError::UnknownActor`] if `actor` is outside the ring.
    pub fn order(&self, actor: ActorId) -> Result<AcquisitionOrder, RingError> {
        if actor.index() >= self.len() {
            return Err(RingError::UnknownActor {
                actor,
                actors: self.len(),
            });
        }
        Ok(acquisition_order(actor, self.len()))
    }

    /// Actor currently holding `resource`, if any.
    #[must_use]
    pub fn holder(&self, resource: ResourceId) -> Option<ActorId> {
        self.resources.get(resource.index())?.holder()
    }

    /// How many actors hold `resource` right now. Never more than 1.
    #[must_use]
    pub fn occupancy(&self, resource: ResourceId) -> usize {
        self.resources
            .get(resource.index())
            .map_or(0, Resource::occupancy)
    }

    /// Runs all rounds for `actor` on the current thread.
    ///
    /// # Errors
    ///
    /// [`RingError::UnknownActor`] if `actor` is outside the ring.
    pub fn run_actor(&self, actor: ActorId) -> Result<ActorReport, RingError> {
        self.run_actor_with(actor, |_| {})
    }

    /// Like [`Self::run_actor`], reporting every step to `observe`.
    ///
    /// `observe` runs on the actor's thread. For [`RingEvent::Working`] it runs
    /// while both resources are held.
    ///
    /// # Errors
    ///
    /// [`RingError::UnknownActor`] if `actor` is outside the ring.
    pub fn run_actor_with<F>(
        &self,
        actor: ActorId,
        mut observe: F,
    ) -> Result<ActorReport, RingError>
    where
        F: FnMut(RingEvent),
    {
        let order = self.order(actor)?;
        let first = &self.resources[order.first.index()];
        let second = &self.resources[order.second.index()];
        let mut waited = Duration::ZERO;

        for round in 1..=self.config.rounds {
            trace!(actor = %actor, round, "thinking");
            observe(RingEvent::Thinking { actor, round });
            self.config.think.pause();

            let started = Instant::now();

            trace!(actor = %actor, round, resource = %order.first, "awaiting first");
            observe(RingEvent::AwaitingFirst {
                actor,
                round,
                resource: order.first,
            });
            let first_held = first.acquire(actor);

            trace!(actor = %actor, round, resource = %order.second, "awaiting second");
            observe(RingEvent::AwaitingSecond {
                actor,
                round,
                resource: order.second,
            });
            let second_held = second.acquire(actor);

            waited += started.elapsed();

            trace!(actor = %actor, round, "working");
            observe(RingEvent::Working {
                actor,
                round,
                held: order,
            });
            self.config.work.pause();

            // Reverse of acquisition.
            drop(second_held);
            drop(first_held);

            trace!(actor = %actor, round, "finished");
            observe(RingEvent::Finished { actor, round });
        }

        debug!(
            actor = %actor,
            rounds = self.config.rounds,
            waited_ms = waited.as_millis() as u64,
            "actor done"
        );

        Ok(ActorReport {
            actor,
            rounds: self.config.rounds,
            waited,
        })
    }

    /// Runs every actor on its own thread and waits for all of them.
    ///
    /// Threads are scoped to this call and borrow the ring. `observe` is shared
    /// by all actors and called concurrently.
    ///
    /// # Errors
    ///
    /// - [`RingError::Spawn`] if a thread cannot be started. Actors already
    ///   running still complete before this returns.
    /// - [`RingError::ActorPanicked`] if an actor (or `observe`) panics.
    pub fn run<F>(&self, observe: F) -> Result<RingReport, RingError>
    where
        F: Fn(RingEvent) + Sync,
    {
        let started = Instant::now();
        let observe = &observe;

        let actors = thread::scope(|scope| -> Result<Vec<ActorReport>, RingError> {
            let mut handles = Vec::with_capacity(self.len());
            let mut failure = None;

            for index in 0..self.len() {
                let actor = ActorId::new(index);
                let spawned = thread::Builder::new()
                    .name(format!("actor-{actor}"))
                    .spawn_scoped(scope, move || self.run_actor_with(actor, observe));
                match spawned {
                    Ok(handle) => handles.push((actor, handle)),
                    Err(source) => {
                        warn!(actor = %actor, error = %source, "failed to spawn actor");
                        failure = Some(RingError::Spawn { actor, source });
                        break;
                    }
                }
            }

            // Join everything before reporting, so no panicked thread is left
            // for the scope to re-raise.
            let mut reports = Vec::with_capacity(handles.len());
            for (actor, handle) in handles {
                match handle.join() {
                    Ok(Ok(report)) => reports.push(report),
                    Ok(Err(e)) => {
                        failure.get_or_insert(e);
                    }
                    Err(_) => {
                        warn!(actor = %actor, "actor panicked");
                        failure.get_or_insert(RingError::ActorPanicked { actor });
                    }
                }
            }

            match failure {
                Some(e) => Err(e),
                None => Ok(reports),
            }
        })?;

        let elapsed = started.elapsed();
        debug!(elapsed_ms = elapsed.as_millis() as u64, "ring finished");

        Ok(RingReport { actors, elapsed })
    }
}
