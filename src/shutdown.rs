use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cooperative stop signal shared between a sleeping loop and the thread
/// that cancels it.
///
/// Loops park on [`ShutdownSignal::wait_timeout`] instead of a plain sleep
/// so that [`ShutdownSignal::trigger`] can wake them immediately. A wake
/// caused by the signal is a stop request, never an error.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: AtomicBool,
    lock: Mutex<()>,
    cv: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal and wakes every waiter. Idempotent.
    pub fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        let _guard = self.lock.lock().unwrap();
        self.cv.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Parks the calling thread for up to `timeout`. Returns `true` when
    /// the signal fired, `false` when the full timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock().unwrap();
        while !self.is_triggered() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (next_guard, wait) = self.cv.wait_timeout(guard, remaining).unwrap();
            guard = next_guard;
            if wait.timed_out() {
                return self.is_triggered();
            }
        }
        true
    }
}
