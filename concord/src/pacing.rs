//! Sleep-based pacing for simulated work.
//!
//! Actors and channel endpoints do nothing useful between synchronization
//! points; a [`Pacing`] stands in for that time so that interleavings vary.

use std::thread;
use std::time::Duration;

use rand::Rng;

/// How long a simulated step lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Return immediately.
    #[default]
    None,
    /// Sleep for exactly this long.
    Fixed(Duration),
    /// Sleep for a duration drawn uniformly from `min..=max`.
    Uniform {
        /// Shortest pause.
        min: Duration,
        /// Longest pause.
        max: Duration,
    },
}

impl Pacing {
    /// Uniform pacing in whole seconds, e.g. `Pacing::seconds(1, 3)`.
    #[must_use]
    pub const fn seconds(min: u64, max: u64) -> Self {
        Self::Uniform {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    /// Picks the next pause length.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => d,
            Self::Uniform { min, max } if max <= min => min,
            Self::Uniform { min, max } => rand::rng().random_range(min..=max),
        }
    }

    /// Sleeps the current thread for [`Self::next_delay`].
    pub fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

impl From<Duration> for Pacing {
    fn from(d: Duration) -> Self {
        Self::Fixed(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_and_none() {
        assert_eq!(Pacing::None.next_delay(), Duration::ZERO);
        assert_eq!(
            Pacing::from(Duration::from_millis(7)).next_delay(),
            Duration::from_millis(7)
        );
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let pacing = Pacing::Uniform {
            min: Duration::from_millis(2),
            max: Duration::from_millis(5),
        };
        for _ in 0..200 {
            let d = pacing.next_delay();
            assert!(d >= Duration::from_millis(2) && d <= Duration::from_millis(5));
        }
    }

    #[test]
    fn test_inverted_range_uses_min() {
        let pacing = Pacing::Uniform {
            min: Duration::from_millis(9),
            max: Duration::from_millis(1),
        };
        assert_eq!(pacing.next_delay(), Duration::from_millis(9));
    }
}
