//! Bounded counting semaphore parked on an atomic counter.
//!
//! Jobs use four of these (`continue`, `consume`, `exit`, `terminated`) as
//! their handshake. The count saturates at `max`: posting a full semaphore is
//! a no-op, which makes repeated "kick" posts from a producer coalesce into a
//! single wakeup of the consumer.

use crate::wait;
use crate::{TransportError, TransportResult};
use std::time::{Duration, Instant};

#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicU32, Ordering};

const SPIN_LIMIT: u32 = 64;
const MAX_TIMED_SLEEP: Duration = Duration::from_micros(200);

/// Counting semaphore with a fixed maximum count.
#[derive(Debug)]
pub struct Semaphore {
    count: AtomicU32,
    max: u32,
}

impl Semaphore {
    /// Creates a semaphore holding `initial` permits and saturating at `max`.
    pub fn new(initial: u32, max: u32) -> TransportResult<Self> {
        if max == 0 || initial > max {
            return Err(TransportError::InvalidSemaphoreCount { initial, max });
        }
        Ok(Self {
            count: AtomicU32::new(initial),
            max,
        })
    }

    /// Semaphore with no initial permits and a maximum of one.
    pub fn binary() -> Self {
        Self {
            count: AtomicU32::new(0),
            max: 1,
        }
    }

    /// Maximum number of permits the semaphore holds.
    pub fn max_count(&self) -> u32 {
        self.max
    }

    /// Current number of available permits.
    pub fn available(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Releases one permit and wakes a waiter.
    ///
    /// Returns `false` when the semaphore was already saturated.
    pub fn post(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);
        loop {
            if current >= self.max {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        wait::wake_one(&self.count);
        true
    }

    /// Takes a permit if one is available without blocking.
    pub fn try_wait(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Blocks until a permit is available and takes it.
    pub fn wait(&self) {
        loop {
            if self.try_wait() {
                return;
            }
            wait::wait_u32(&self.count, 0);
        }
    }

    /// Blocks for at most `timeout` waiting for a permit.
    ///
    /// Returns `true` when a permit was taken.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut spins = 0u32;
        loop {
            if self.try_wait() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if spins < SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
            } else {
                std::thread::sleep((deadline - now).min(MAX_TIMED_SLEEP));
            }
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rejects_initial_above_max() {
        assert_eq!(
            Semaphore::new(2, 1).unwrap_err(),
            TransportError::InvalidSemaphoreCount { initial: 2, max: 1 }
        );
        assert!(Semaphore::new(0, 0).is_err());
    }

    #[test]
    fn post_saturates_at_max() {
        let sem = Semaphore::binary();
        assert!(sem.post());
        assert!(!sem.post());
        assert_eq!(sem.available(), 1);
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
    }

    #[test]
    fn counting_semaphore_hands_out_each_permit_once() {
        let sem = Semaphore::new(3, 4).expect("semaphore");
        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
    }

    #[test]
    fn wait_unblocks_on_post_from_other_thread() {
        let sem = Arc::new(Semaphore::binary());
        let poster = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                sem.post();
            })
        };
        sem.wait();
        poster.join().unwrap();
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn wait_timeout_expires_without_post() {
        let sem = Semaphore::binary();
        let start = Instant::now();
        assert!(!sem.wait_timeout(Duration::from_millis(10)));
        assert!(start.elapsed() >= Duration::from_millis(10));
        sem.post();
        assert!(sem.wait_timeout(Duration::from_millis(10)));
    }
}
