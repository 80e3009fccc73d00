//! Two classic coordination problems over blocking primitives.
//!
//! - [`ring`]: the dining philosophers. `N` actors in a cycle each need two
//!   adjacent resources; a global acquisition order rules out deadlock.
//! - [`channel`]: the bounded buffer. Producers and consumers hand items
//!   through a fixed ring of slots guarded by two counting semaphores and a
//!   mutex.
//!
//! The two share nothing but the [`sync`] primitives and [`Pacing`].

pub mod channel;
pub mod pacing;
pub mod ring;
pub mod sync;
mod trace;

pub use pacing::Pacing;
pub use trace::init_tracing;
