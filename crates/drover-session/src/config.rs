use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GUARD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_READY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RESPONSE_POLL_MS: u64 = 10;
const DEFAULT_QUIT_POLL_MS: u64 = 100;
const DEFAULT_QUIT_POLL_ATTEMPTS: u32 = 50;
const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JOIN_POLL_MS: u64 = 50;
const DEFAULT_KEEP_ALIVE_MS: u64 = 500;

const GUARD_FILE_NAME: &str = "drover-session-init.lock";

/// Timings and named resources for one session.
///
/// The defaults are part of the protocol's observable behavior (callers
/// depend on which waits are bounded and by how much); overrides exist for
/// deployment tuning and tests, not to change the model.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path of the system-wide lock file serializing session creation.
    pub guard_path: PathBuf,
    pub guard_timeout: Duration,
    pub ready_timeout: Duration,
    /// Interval between response-length probes. The probe loop itself is
    /// unbounded.
    pub response_poll_interval: Duration,
    pub quit_poll_interval: Duration,
    pub quit_poll_attempts: u32,
    pub join_timeout: Duration,
    pub join_poll_interval: Duration,
    pub keep_alive_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let guard_path = env::var("DROVER_GUARD_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join(GUARD_FILE_NAME));
        Self {
            guard_path,
            guard_timeout: Duration::from_secs(env_u64(
                "DROVER_GUARD_TIMEOUT",
                DEFAULT_GUARD_TIMEOUT_SECS,
            )),
            ready_timeout: Duration::from_secs(env_u64(
                "DROVER_READY_TIMEOUT",
                DEFAULT_READY_TIMEOUT_SECS,
            )),
            response_poll_interval: Duration::from_millis(DEFAULT_RESPONSE_POLL_MS),
            quit_poll_interval: Duration::from_millis(DEFAULT_QUIT_POLL_MS),
            quit_poll_attempts: DEFAULT_QUIT_POLL_ATTEMPTS,
            join_timeout: Duration::from_secs(env_u64(
                "DROVER_JOIN_TIMEOUT",
                DEFAULT_JOIN_TIMEOUT_SECS,
            )),
            join_poll_interval: Duration::from_millis(DEFAULT_JOIN_POLL_MS),
            keep_alive_interval: Duration::from_millis(env_u64(
                "DROVER_KEEP_ALIVE_MS",
                DEFAULT_KEEP_ALIVE_MS,
            )),
        }
    }

    pub fn with_guard_path(mut self, path: PathBuf) -> Self {
        self.guard_path = path;
        self
    }

    pub fn with_guard_timeout(mut self, timeout: Duration) -> Self {
        self.guard_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_quit_poll_attempts(mut self, attempts: u32) -> Self {
        self.quit_poll_attempts = attempts;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }
}
