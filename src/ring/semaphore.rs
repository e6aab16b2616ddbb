//! Counting semaphore built on parking_lot primitives
//!
//! The flow-control discipline of the ring needs a classic counting
//! semaphore: `empty_slots` starts at the buffer capacity and `full_slots`
//! at zero, and every byte transferred moves one permit from one to the
//! other. parking_lot does not ship a semaphore, so this module builds one
//! from a `Mutex<usize>` permit count and a `Condvar`, the same pairing the
//! buffer uses for its consumer wake-up signal.

use parking_lot::{Condvar, Mutex};

/// A counting semaphore: a non-negative permit count where acquiring
/// blocks until a permit is available and releasing wakes one waiter.
pub(crate) struct Semaphore {
    /// Current number of available permits
    permits: Mutex<usize>,
    /// Waiters blocked in `acquire`
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `permits` initial permits
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Block until a permit is available, then take it
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Take a permit if one is immediately available
    ///
    /// Returns `true` if a permit was taken. Never blocks; this is the
    /// lookahead the block-crossing protocol uses while a block lock is
    /// still held.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits > 0 {
            *permits -= 1;
            true
        } else {
            false
        }
    }

    /// Return one permit, waking a blocked acquirer if any
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }

    /// Current permit count (diagnostic only, racy by nature)
    #[cfg(test)]
    pub fn permits(&self) -> usize {
        *self.permits.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_initial_permits() {
        let sem = Semaphore::new(3);
        assert_eq!(sem.permits(), 3);

        sem.acquire();
        sem.acquire();
        assert_eq!(sem.permits(), 1);

        sem.release();
        assert_eq!(sem.permits(), 2);
    }

    #[test]
    fn test_try_acquire_exhaustion() {
        let sem = Semaphore::new(2);

        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());

        sem.release();
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let sem = Arc::new(Semaphore::new(0));
        let sem_clone = sem.clone();

        let waiter = thread::spawn(move || {
            sem_clone.acquire();
        });

        // Give the waiter time to block, then wake it
        thread::sleep(Duration::from_millis(50));
        sem.release();

        waiter.join().unwrap();
        assert_eq!(sem.permits(), 0);
    }

    #[test]
    fn test_many_waiters() {
        const WAITERS: usize = 8;

        let sem = Arc::new(Semaphore::new(0));
        let mut handles = vec![];

        for _ in 0..WAITERS {
            let sem_clone = sem.clone();
            handles.push(thread::spawn(move || {
                sem_clone.acquire();
            }));
        }

        for _ in 0..WAITERS {
            sem.release();
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sem.permits(), 0);
    }
}
