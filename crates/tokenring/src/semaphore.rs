use crate::RingError;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

// =============================================================================
// CLOSABLE COUNTING SEMAPHORE
// =============================================================================
//
// Permits and the `closed` flag live under one mutex, so a waiter checks both
// and parks atomically with respect to `close()`:
//
// - `close()` sets `closed` while holding the mutex, then `notify_all`.
// - A waiter that checked `closed == false` is already parked on the condvar
//   by the time `close()` can take the mutex, so it gets the notification.
// - A waiter arriving later sees `closed == true` before parking.
//
// There is no window in which a wakeup can be lost, and no count of "extra
// units" to get right. Once closed, every acquire fails with
// `RingError::Shutdown`, even if permits remain.
//
// =============================================================================

#[derive(Debug)]
struct Permits {
    available: usize,
    closed: bool,
}

/// Counting semaphore whose waiters can be cancelled by closing it.
#[derive(Debug)]
pub struct Semaphore {
    name: &'static str,
    permits: Mutex<Permits>,
    ready: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with `initial` permits. `name` shows up in errors.
    pub fn new(name: &'static str, initial: usize) -> Self {
        Self {
            name,
            permits: Mutex::new(Permits {
                available: initial,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Permits>, RingError> {
        self.permits.lock().map_err(|_| RingError::poisoned(self.name))
    }

    /// Waits for a permit. Fails with [`RingError::Shutdown`] once closed.
    pub fn acquire(&self) -> Result<(), RingError> {
        let mut permits = self.lock()?;
        loop {
            if permits.closed {
                return Err(RingError::Shutdown);
            }
            if permits.available > 0 {
                permits.available -= 1;
                return Ok(());
            }
            permits = self
                .ready
                .wait(permits)
                .map_err(|_| RingError::poisoned(self.name))?;
        }
    }

    /// Waits at most `timeout` for a permit. Returns `Ok(false)` on timeout.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<bool, RingError> {
        let deadline = Instant::now() + timeout;
        let mut permits = self.lock()?;
        loop {
            if permits.closed {
                return Err(RingError::Shutdown);
            }
            if permits.available > 0 {
                permits.available -= 1;
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            permits = self
                .ready
                .wait_timeout(permits, deadline - now)
                .map_err(|_| RingError::poisoned(self.name))?
                .0;
        }
    }

    /// Takes a permit if one is available right now.
    pub fn try_acquire(&self) -> Result<bool, RingError> {
        let mut permits = self.lock()?;
        if permits.closed {
            return Err(RingError::Shutdown);
        }
        if permits.available > 0 {
            permits.available -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Returns one permit and wakes a waiter.
    pub fn release(&self) -> Result<(), RingError> {
        let mut permits = self.lock()?;
        permits.available += 1;
        drop(permits);
        self.ready.notify_one();
        Ok(())
    }

    /// Closes the semaphore and wakes every waiter. Idempotent.
    pub fn close(&self) -> Result<(), RingError> {
        let mut permits = self.lock()?;
        permits.closed = true;
        drop(permits);
        self.ready.notify_all();
        Ok(())
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.permits.lock().map_or(true, |p| p.closed)
    }

    /// Permits currently available.
    pub fn available(&self) -> usize {
        self.permits.lock().map_or(0, |p| p.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counting() {
        let sem = Semaphore::new("test", 2);
        sem.acquire().unwrap();
        sem.acquire().unwrap();
        assert!(!sem.try_acquire().unwrap());
        sem.release().unwrap();
        assert_eq!(sem.available(), 1);
        assert!(sem.try_acquire().unwrap());
    }

    #[test]
    fn test_acquire_timeout_expires() {
        let sem = Semaphore::new("test", 0);
        assert!(!sem.acquire_timeout(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_release_wakes_waiter() {
        let sem = Arc::new(Semaphore::new("test", 0));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire())
        };
        thread::sleep(Duration::from_millis(20));
        sem.release().unwrap();
        assert!(waiter.join().unwrap().is_ok());
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_close_wakes_all_waiters() {
        let sem = Arc::new(Semaphore::new("test", 0));
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let sem = Arc::clone(&sem);
                thread::spawn(move || sem.acquire())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        sem.close().unwrap();
        for w in waiters {
            assert!(matches!(w.join().unwrap(), Err(RingError::Shutdown)));
        }
    }

    #[test]
    fn test_closed_rejects_even_with_permits() {
        let sem = Semaphore::new("test", 3);
        sem.close().unwrap();
        sem.close().unwrap();
        assert!(sem.is_closed());
        assert!(matches!(sem.acquire(), Err(RingError::Shutdown)));
        assert!(matches!(sem.try_acquire(), Err(RingError::Shutdown)));
    }
}
