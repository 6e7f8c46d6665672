//! Cross-process guard serializing session creation.
//!
//! Independent driver processes sharing one automation engine must not
//! initialize sessions concurrently. The guard is an advisory `flock(2)`
//! on a fixed, system-visible path, acquired with a bounded wait. Every
//! acquisition outcome is non-fatal: the guard reduces races, it does not
//! eliminate them, and initialization proceeds on every path.
//!
//! While held, the guard file carries the holder's PID; a clean release
//! truncates it. A leftover PID belonging to a dead process therefore
//! means the previous holder terminated without releasing.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::sleeper::Sleeper;

const ACQUIRE_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// The distinguishable, loggable, non-fatal acquisition outcomes.
pub enum GuardOutcome {
    Acquired(InitGuard),
    /// The lock was obtained, but the previous holder's recorded PID no
    /// longer maps to a live process: it was likely terminated while
    /// holding the guard.
    AcquiredAfterAbandonment(InitGuard),
    TimedOut,
    /// The guard file itself could not be opened or locked. Multiple
    /// concurrently-initializing instances may behave unpredictably.
    Unavailable(std::io::Error),
}

/// A held guard. Truncates the PID record and unlocks on drop.
pub struct InitGuard {
    file: File,
}

impl InitGuard {
    /// Acquire the guard within `timeout`, retrying at a fixed interval.
    pub fn acquire(path: &Path, timeout: Duration, sleeper: &dyn Sleeper) -> GuardOutcome {
        let previous_pid = read_recorded_pid(path);

        let mut file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
        {
            Ok(f) => f,
            Err(e) => return GuardOutcome::Unavailable(e),
        };

        let fd = file.as_raw_fd();
        let deadline = Instant::now() + timeout;
        loop {
            // SAFETY: fd is a valid descriptor owned by `file`.
            let rc = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
            if rc == 0 {
                break;
            }
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EWOULDBLOCK) {
                return GuardOutcome::Unavailable(err);
            }
            if Instant::now() >= deadline {
                return GuardOutcome::TimedOut;
            }
            sleeper.sleep(ACQUIRE_RETRY_INTERVAL);
        }

        if let Err(e) = record_pid(&mut file) {
            warn!("unable to record PID in guard file: {}", e);
        }

        let guard = InitGuard { file };
        match previous_pid {
            Some(pid) if pid != std::process::id() && !process_alive(pid) => {
                GuardOutcome::AcquiredAfterAbandonment(guard)
            }
            _ => GuardOutcome::Acquired(guard),
        }
    }
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        // Clean release: remove the PID record so the next acquirer does
        // not mistake it for an abandoned hold, then unlock.
        let _ = self.file.set_len(0);
        // SAFETY: fd is valid for the lifetime of `file`.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

fn read_recorded_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

fn record_pid(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

fn process_alive(pid: u32) -> bool {
    // Signal 0 probes existence. EPERM still means the process exists.
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
