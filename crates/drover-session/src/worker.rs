//! The dedicated worker thread that owns all automation state.
//!
//! The `CommandExecutor` is constructed on the worker thread and never
//! leaves it; the registry it owns holds `Rc` handles that cannot cross
//! threads. The controller reaches it only through the message channel.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::OnceLock;

use tracing::{debug, trace, warn};
use uuid::Uuid;

use drover_protocol::error_codes;
use drover_protocol::{Command, Response};

use crate::channel::{self, Endpoint, Inbox, Message, Reply};
use crate::handlers::{default_handlers, CommandHandler};
use crate::registry::{BrowserFactory, SessionParameters, SessionRegistry};

/// Shared, caller-managed context record passed to the worker thread.
///
/// The worker publishes its endpoint address and session id here, write
/// once, before firing the ready signal; the controller reads them only
/// after the handshake.
pub(crate) struct ThreadContext {
    pub params: SessionParameters,
    pub endpoint: OnceLock<Endpoint>,
    pub session_id: OnceLock<String>,
}

impl ThreadContext {
    pub fn new(params: SessionParameters) -> Self {
        Self {
            params,
            endpoint: OnceLock::new(),
            session_id: OnceLock::new(),
        }
    }
}

/// Worker-thread entry point: build the executor, publish the endpoint,
/// signal ready, pump messages until close.
pub(crate) fn run(
    ctx: Arc<ThreadContext>,
    ready: mpsc::Sender<()>,
    factory: Box<dyn BrowserFactory>,
) {
    let (endpoint, inbox) = channel::channel();
    let mut executor = CommandExecutor::new(&ctx.params, factory.as_ref());

    let _ = ctx.session_id.set(executor.session_id.clone());
    let _ = ctx.endpoint.set(endpoint);
    let _ = ready.send(());
    trace!(session_id = %executor.session_id, "command executor ready");

    executor.pump(inbox);
    debug!(session_id = %executor.session_id, "command executor thread ending");
}

pub(crate) struct CommandExecutor {
    session_id: String,
    // Carried by the INIT message for older clients; nothing reads it after
    // the handshake.
    #[allow(dead_code)]
    port: u16,
    serialized_command: Option<String>,
    serialized_response: String,
    registry: SessionRegistry,
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandExecutor {
    pub fn new(params: &SessionParameters, factory: &dyn BrowserFactory) -> Self {
        let mut registry = SessionRegistry::new();
        if let Err(e) = factory.launch(params, &mut registry) {
            // A failed launch degrades the session (no browsers, commands
            // report no such window); it must not kill the pump.
            warn!("initial browser launch failed: {}", e);
        }
        Self {
            session_id: Uuid::new_v4().to_string(),
            port: params.port,
            serialized_command: None,
            serialized_response: String::new(),
            registry,
            handlers: default_handlers(),
        }
    }

    pub fn pump(&mut self, inbox: Inbox) {
        while let Some(envelope) = inbox.recv() {
            let closing = matches!(envelope.message, Message::Close);
            let reply = self.handle(envelope.message);
            if let Some(tx) = envelope.reply {
                let _ = tx.send(reply);
            }
            if closing {
                return;
            }
        }
        // Every endpoint clone vanished without a close message; tear the
        // registry down before the thread exits.
        self.registry.tear_down();
    }

    fn handle(&mut self, message: Message) -> Reply {
        match message {
            Message::Init { port } => {
                self.port = port;
                trace!(port, "INIT received");
                Reply::Unit
            }
            Message::SetCommand(serialized) => {
                trace!(len = serialized.len(), "command stored");
                self.serialized_command = Some(serialized);
                self.serialized_response.clear();
                Reply::Unit
            }
            Message::ExecCommand => {
                self.execute_stored_command();
                Reply::Unit
            }
            Message::ResponseLength => Reply::Length(self.serialized_response.len()),
            Message::FetchResponse { mut buffer } => {
                let bytes = self.serialized_response.as_bytes();
                let n = bytes.len().min(buffer.len().saturating_sub(1));
                buffer[..n].copy_from_slice(&bytes[..n]);
                Reply::Buffer(buffer)
            }
            Message::SessionValid => {
                Reply::Flag(self.registry.has_open_browsers() && !self.registry.quit_requested())
            }
            Message::QuitStatus => Reply::Count(self.registry.pending_teardown_count()),
            Message::Close => {
                debug!(session_id = %self.session_id, "close requested, tearing down registry");
                self.registry.tear_down();
                Reply::Unit
            }
        }
    }

    /// Dispatch the stored command. Always leaves a non-empty serialized
    /// response behind: once a command was stored, it is never silently
    /// dropped.
    fn execute_stored_command(&mut self) {
        let mut response = Response::new();
        match self.serialized_command.take() {
            None => {
                response.set_error_response(
                    error_codes::UNKNOWN_ERROR,
                    "No command has been set for execution",
                );
            }
            Some(serialized) => match Command::from_json(&serialized) {
                Err(e) => {
                    response.set_error_response(
                        error_codes::INVALID_ARGUMENT,
                        &format!("Unable to parse command: {}", e),
                    );
                }
                Ok(command) => match self.handlers.get(command.name.as_str()) {
                    None => {
                        response.set_error_response(
                            error_codes::UNKNOWN_COMMAND,
                            &format!("Unknown command: {}", command.name),
                        );
                    }
                    Some(handler) => {
                        trace!(command = %command.name, "dispatching command");
                        handler.execute(&mut self.registry, &command.parameters, &mut response);
                    }
                },
            },
        }
        self.serialized_response = response.to_json();
    }
}
