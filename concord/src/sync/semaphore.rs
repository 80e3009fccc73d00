//! Counting semaphore built on `Mutex` + `Condvar`.
//!
//! [`Semaphore::wait`] takes one permit, blocking while none are available.
//! [`Semaphore::signal`] returns one permit and wakes a single waiter.
//! Waiters sleep on the condition variable; nothing spins.
//!
//! A semaphore can also be [closed](Semaphore::close). Closing never discards
//! permits: waiters keep taking permits while any remain and only observe
//! [`Closed`] once the count is zero. This lets a bounded channel drain what
//! was already enqueued before its consumers stop.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Returned by [`Semaphore::wait`] when the semaphore is closed and empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("semaphore closed")]
pub struct Closed;

#[derive(Debug)]
struct State {
    permits: usize,
    closed: bool,
}

/// Counting semaphore.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // The count is only ever adjusted by a single `+= 1`/`-= 1` under the
    // lock, so a poisoned lock still holds a consistent value.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes one permit, blocking until one is available.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the semaphore was closed and has no permits left.
    pub fn wait(&self) -> Result<(), Closed> {
        let mut state = self.lock();
        while state.permits == 0 {
            if state.closed {
                return Err(Closed);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.permits -= 1;
        Ok(())
    }

    /// Returns one permit and wakes one waiter.
    pub fn signal(&self) {
        let mut state = self.lock();
        state.permits += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Marks the semaphore closed and wakes every waiter.
    ///
    /// Remaining permits stay available to [`Self::wait`].
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    /// Current number of permits.
    ///
    /// Only a snapshot: other threads may change it immediately after.
    #[must_use]
    pub fn permits(&self) -> usize {
        self.lock().permits
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_wait_and_signal_adjust_permits() {
        let sema = Semaphore::new(2);
        sema.wait().unwrap();
        sema.wait().unwrap();
        assert_eq!(sema.permits(), 0);

        sema.signal();
        assert_eq!(sema.permits(), 1);
        sema.wait().unwrap();
        assert_eq!(sema.permits(), 0);
    }

    #[test]
    fn test_wait_blocks_until_signal() {
        let sema = Arc::new(Semaphore::new(0));
        let woke = Arc::new(AtomicUsize::new(0));

        let handle = {
            let sema = Arc::clone(&sema);
            let woke = Arc::clone(&woke);
            thread::spawn(move || {
                sema.wait().unwrap();
                woke.fetch_add(1, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(woke.load(Ordering::SeqCst), 0, "waiter ran without a permit");

        sema.signal();
        handle.join().unwrap();
        assert_eq!(woke.load(Ordering::SeqCst), 1);
        assert_eq!(sema.permits(), 0);
    }

    #[test]
    fn test_permits_bound_concurrency() {
        let sema = Arc::new(Semaphore::new(3));
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sema = Arc::clone(&sema);
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    for _ in 0..20 {
                        sema.wait().unwrap();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                        sema.signal();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(sema.permits(), 3);
    }

    #[test]
    fn test_close_wakes_waiters() {
        let sema = Arc::new(Semaphore::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let sema = Arc::clone(&sema);
                thread::spawn(move || sema.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        sema.close();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Err(Closed));
        }
        assert_eq!(sema.wait(), Err(Closed));
    }

    #[test]
    fn test_close_keeps_remaining_permits() {
        let sema = Semaphore::new(2);
        sema.close();

        assert_eq!(sema.wait(), Ok(()));
        assert_eq!(sema.wait(), Ok(()));
        assert_eq!(sema.wait(), Err(Closed));
    }
}
