//! The session's recurring background task.
//!
//! Runs a callback at a fixed interval on its own named thread. Shutdown
//! ordering matters to its callers: this task must be stopped before the
//! worker thread is torn down, because it touches state the worker still
//! owns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{trace, warn};

pub struct KeepAlive {
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl KeepAlive {
    /// Spawn the ticker. A spawn failure is logged and yields an inert
    /// handle; the session works without its keep-alive, just degraded.
    pub fn start<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop_flag);
        let worker = thread::Builder::new()
            .name(String::from("session-keep-alive"))
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    tick();
                    thread::sleep(interval);
                }
            })
            .map_err(|e| warn!("unable to spawn keep-alive thread: {}", e))
            .ok();
        Self { stop_flag, worker }
    }

    /// A keep-alive with the default heartbeat callback.
    pub fn start_heartbeat(interval: Duration) -> Self {
        Self::start(interval, || trace!("session keep-alive tick"))
    }

    /// Stop the ticker and wait for its thread to exit. Blocks for at most
    /// one interval.
    pub fn stop(mut self) {
        self.stop_now();
    }

    fn stop_now(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop_now();
    }
}
