//! Sleep abstraction for the fixed-interval poll loops.
//!
//! Every wait in the session protocol is a sleep-and-retry loop; routing
//! the sleeps through a trait lets tests count iterations instead of
//! burning wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Records sleep calls without sleeping.
#[derive(Debug, Default)]
pub struct MockSleeper {
    call_count: AtomicU64,
    durations: Mutex<Vec<Duration>>,
}

impl MockSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn durations(&self) -> Vec<Duration> {
        drover_common::mutex_lock_or_recover(&self.durations).clone()
    }

    pub fn total_duration(&self) -> Duration {
        self.durations().iter().sum()
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&self, duration: Duration) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        drover_common::mutex_lock_or_recover(&self.durations).push(duration);
    }
}
