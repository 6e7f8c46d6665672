//! One session's lifecycle: initialize, execute commands, shut down.
//!
//! The controller lives on the caller's thread and owns exactly one worker
//! thread; every interaction with live browser state goes through the
//! worker's message endpoint. Commands within a session are strictly
//! serialized: callers must not overlap `execute_command` calls on the
//! same session.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::channel::{Endpoint, Message, Reply};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::init_guard::{GuardOutcome, InitGuard};
use crate::keep_alive::KeepAlive;
use crate::registry::{BrowserFactory, SessionParameters};
use crate::sleeper::{RealSleeper, Sleeper};
use crate::worker::{self, ThreadContext};

const SESSION_ID_MAX_LEN: usize = 36;

pub struct SessionController {
    config: SessionConfig,
    sleeper: Arc<dyn Sleeper>,
    session_id: String,
    endpoint: Option<Endpoint>,
    worker: Option<JoinHandle<()>>,
    keep_alive: Option<KeepAlive>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sleeper: Arc::new(RealSleeper),
            session_id: String::new(),
            endpoint: None,
            worker: None,
            keep_alive: None,
        }
    }

    /// Replace the sleeper driving every poll loop. Tests use this to
    /// count iterations instead of waiting.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The worker-derived session id; empty means no valid session was
    /// established and the caller must treat the session as unusable.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_initialized(&self) -> bool {
        self.endpoint.is_some() && !self.session_id.is_empty()
    }

    /// Bring the session up: acquire the cross-process guard, spawn the
    /// worker, run the ready handshake, and read the published session id.
    ///
    /// Never fails hard. Every degraded path (guard timeout, handshake
    /// timeout, missing endpoint) is logged and leaves the session id
    /// empty for the caller to check.
    pub fn initialize(&mut self, params: SessionParameters, factory: Box<dyn BrowserFactory>) {
        trace!("entering SessionController::initialize");

        let guard = self.acquire_init_guard();

        let port = params.port;
        let ctx = Arc::new(ThreadContext::new(params));
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker_ctx = Arc::clone(&ctx);
        let spawned = thread::Builder::new()
            .name(String::from("command-executor"))
            .spawn(move || worker::run(worker_ctx, ready_tx, factory));
        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => debug!("unable to create thread for command executor: {}", e),
        }

        if self.worker.is_some() {
            // The worker may still become ready shortly after the timeout,
            // so a failed wait only logs; the endpoint probe below decides.
            if let Err(e) = ready_rx.recv_timeout(self.config.ready_timeout) {
                warn!("unable to wait until created thread notification: {}", e);
            }
        }

        match ctx.endpoint.get() {
            Some(endpoint) => {
                trace!("created thread for command executor published its endpoint");
                // Retained for wire compatibility; the worker only records
                // the port.
                if let Err(e) = endpoint.send(Message::Init { port }) {
                    warn!("unable to deliver INIT to command executor: {}", e);
                }

                let mut session_id = ctx.session_id.get().cloned().unwrap_or_default();
                session_id.truncate(SESSION_ID_MAX_LEN);
                trace!(session_id = %session_id, "session id retrieved from command executor");

                self.endpoint = Some(endpoint.clone());
                self.session_id = session_id;

                self.keep_alive = Some(KeepAlive::start_heartbeat(self.config.keep_alive_interval));
            }
            None => {
                debug!("created thread did not publish an endpoint for the session");
            }
        }

        if guard.is_some() {
            debug!("releasing session initialization guard");
        }
        drop(guard);
    }

    /// Execute one serialized command and return the serialized response
    /// together with whether the session survived the command.
    ///
    /// The four-step protocol: store the command, trigger execution, poll
    /// for the response length (unbounded, fixed interval), then fetch the
    /// response and the validity flag. Does not close the session; acting
    /// on the flag is the caller's decision.
    pub fn execute_command(&self, serialized_command: &str) -> Result<(String, bool), SessionError> {
        trace!("entering SessionController::execute_command");
        let endpoint = self.endpoint.as_ref().ok_or(SessionError::NotInitialized)?;

        endpoint.send(Message::SetCommand(serialized_command.to_string()))?;
        endpoint.post(Message::ExecCommand)?;

        let mut response_length = self.response_length(endpoint)?;
        trace!("beginning wait for response length to be not zero");
        while response_length == 0 {
            // Fixed-interval sleep rather than an event: the worker's pump
            // has no completion signal to raise across the thread boundary.
            self.sleeper.sleep(self.config.response_poll_interval);
            response_length = self.response_length(endpoint)?;
        }
        trace!(response_length, "found non-zero response length");

        // One extra slot for the terminator.
        let buffer = vec![0u8; response_length + 1];
        let bytes = match endpoint.send(Message::FetchResponse { buffer })? {
            Reply::Buffer(bytes) => bytes,
            _ => return Err(SessionError::UnexpectedReply { request: "FetchResponse" }),
        };
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let serialized_response = String::from_utf8_lossy(&bytes[..end]).into_owned();

        let session_is_valid = match endpoint.send(Message::SessionValid)? {
            Reply::Flag(valid) => valid,
            _ => return Err(SessionError::UnexpectedReply { request: "SessionValid" }),
        };

        Ok((serialized_response, session_is_valid))
    }

    /// Orderly, bounded, best-effort shutdown. Logs failures, never
    /// escalates them, and never blocks beyond its bounded waits.
    pub fn shut_down(&mut self) {
        trace!("entering SessionController::shut_down");

        // Stop the background task first; tearing the worker down
        // underneath it corrupts in-flight browser state.
        if let Some(keep_alive) = self.keep_alive.take() {
            keep_alive.stop();
        }

        let Some(endpoint) = self.endpoint.take() else {
            // Degraded session: no endpoint was ever published. Reap the
            // worker if it already ended, but never wait on it.
            if let Some(worker) = self.worker.take() {
                if worker.is_finished() {
                    let _ = worker.join();
                }
            }
            self.session_id.clear();
            return;
        };

        // Wait for browsers to finish tearing down, bounded; proceed
        // regardless once the attempts are exhausted.
        let mut is_quitting = self.quit_status(&endpoint);
        let mut retry_count = self.config.quit_poll_attempts;
        while is_quitting > 0 && retry_count > 0 {
            self.sleeper.sleep(self.config.quit_poll_interval);
            is_quitting = self.quit_status(&endpoint);
            retry_count -= 1;
        }

        if endpoint.post(Message::Close).is_err() {
            debug!("worker endpoint already gone at shutdown");
        }

        if let Some(worker) = self.worker.take() {
            let deadline = Instant::now() + self.config.join_timeout;
            while !worker.is_finished() && Instant::now() < deadline {
                self.sleeper.sleep(self.config.join_poll_interval);
            }
            if worker.is_finished() {
                let _ = worker.join();
                debug!("command executor thread ended");
            } else {
                // Best effort only: drop the handle and let the thread go.
                warn!(
                    "command executor thread did not end within {:?}",
                    self.config.join_timeout
                );
            }
        }

        self.session_id.clear();
    }

    fn acquire_init_guard(&self) -> Option<InitGuard> {
        match InitGuard::acquire(
            &self.config.guard_path,
            self.config.guard_timeout,
            self.sleeper.as_ref(),
        ) {
            GuardOutcome::Acquired(guard) => {
                debug!("guard acquired for session initialization");
                Some(guard)
            }
            GuardOutcome::AcquiredAfterAbandonment(guard) => {
                warn!(
                    "acquired guard previously held by a terminated process; \
                     it may have been abandoned mid-initialization"
                );
                Some(guard)
            }
            GuardOutcome::TimedOut => {
                warn!(
                    "could not acquire guard within the timeout; multiple \
                     instances may hang or behave unpredictably"
                );
                None
            }
            GuardOutcome::Unavailable(e) => {
                warn!(
                    "could not create session initialization guard ({}); \
                     multiple instances will behave unpredictably",
                    e
                );
                None
            }
        }
    }

    fn response_length(&self, endpoint: &Endpoint) -> Result<usize, SessionError> {
        match endpoint.send(Message::ResponseLength)? {
            Reply::Length(length) => Ok(length),
            _ => Err(SessionError::UnexpectedReply { request: "ResponseLength" }),
        }
    }

    /// Count of browsers still tearing down; a vanished worker counts as
    /// fully quit.
    fn quit_status(&self, endpoint: &Endpoint) -> usize {
        match endpoint.send(Message::QuitStatus) {
            Ok(Reply::Count(count)) => count,
            _ => 0,
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.endpoint.is_some() || self.worker.is_some() {
            self.shut_down();
        }
    }
}
