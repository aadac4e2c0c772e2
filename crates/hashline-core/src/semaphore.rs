//! Counting semaphore for limiting concurrent digest calls and in-flight items.
//!
//! Uses `Mutex + Condvar` from std. Waiting is cancellation-aware.

use std::sync::{Condvar, Mutex};

use crate::cancel::{CancelToken, POLL_INTERVAL};

/// A counting semaphore that limits concurrent access to a shared resource.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
}

/// RAII guard that releases one permit on drop.
#[derive(Debug)]
pub struct SemaphoreGuard<'a>(&'a Semaphore);

impl Semaphore {
    /// Create a semaphore with `permits` initial permits (at least one).
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits.max(1)),
            cond: Condvar::new(),
        }
    }

    /// Block until a permit is available, then acquire it.
    ///
    /// Returns `None` if `cancel` fires while waiting.
    pub fn acquire(&self, cancel: &CancelToken) -> Option<SemaphoreGuard<'_>> {
        let mut count = self.state.lock().unwrap();
        while *count == 0 {
            if cancel.is_cancelled() {
                return None;
            }
            count = self.cond.wait_timeout(count, POLL_INTERVAL).unwrap().0;
        }
        *count -= 1;
        Some(SemaphoreGuard(self))
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        *self.state.lock().unwrap()
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        let mut count = self.0.state.lock().unwrap();
        *count += 1;
        self.0.cond.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn acquire_and_release() {
        let cancel = CancelToken::new();
        let sem = Semaphore::new(2);
        let g1 = sem.acquire(&cancel).unwrap();
        let _g2 = sem.acquire(&cancel).unwrap();
        assert_eq!(sem.available(), 0);
        drop(g1);
        assert_eq!(sem.available(), 1);
    }

    #[test]
    fn zero_permits_clamped_to_one() {
        let sem = Semaphore::new(0);
        assert_eq!(sem.available(), 1);
    }

    #[test]
    fn blocking_acquire() {
        let cancel = CancelToken::new();
        let sem = Arc::new(Semaphore::new(1));
        let guard = sem.acquire(&cancel).unwrap();

        let sem2 = sem.clone();
        let cancel2 = cancel.clone();
        let handle = std::thread::spawn(move || {
            let _g = sem2.acquire(&cancel2).unwrap();
            42
        });

        // Give thread time to block
        std::thread::sleep(Duration::from_millis(50));
        drop(guard);

        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn cancel_releases_waiter() {
        let cancel = CancelToken::new();
        let sem = Arc::new(Semaphore::new(1));
        let _held = sem.acquire(&cancel).unwrap();

        let sem2 = sem.clone();
        let cancel2 = cancel.clone();
        let handle = std::thread::spawn(move || sem2.acquire(&cancel2).is_none());

        std::thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        assert!(handle.join().unwrap());
    }
}
