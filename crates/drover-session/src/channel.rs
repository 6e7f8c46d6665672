//! Point-to-point messaging between the caller thread and one worker.
//!
//! An `Endpoint` is the worker's address. `send` enqueues a message and
//! blocks until the worker has handled it and replied; `post` is
//! fire-and-forget. Envelopes drain through a single receiver on the
//! worker thread, so messages from one caller are handled strictly in
//! order.
//!
//! The endpoint is only meaningful between the initialization handshake
//! and the end of shutdown; outside that window every call reports
//! `ChannelError::Disconnected`.

use std::sync::mpsc;

use thiserror::Error;

/// Requests understood by the worker's message pump.
#[derive(Debug)]
pub enum Message {
    /// Carries the session port. Retained for wire compatibility; the
    /// worker only records it.
    Init { port: u16 },
    /// Store a serialized command for later execution. Clears any previous
    /// response.
    SetCommand(String),
    /// Dispatch the stored command to its handler. Posted, never sent: the
    /// caller polls for the response instead of blocking on execution.
    ExecCommand,
    /// Byte length of the serialized response; zero means "not produced
    /// yet".
    ResponseLength,
    /// Fetch the serialized response into a caller-allocated buffer sized
    /// length + 1. The final slot stays zero.
    FetchResponse { buffer: Vec<u8> },
    /// Whether the session survived the last executed command.
    SessionValid,
    /// Number of browsers still tearing down; zero when no quit is in
    /// progress.
    QuitStatus,
    /// Tear down all browser state and stop the pump.
    Close,
}

/// Replies produced by the worker, one per sent message.
#[derive(Debug)]
pub enum Reply {
    Unit,
    Length(usize),
    Buffer(Vec<u8>),
    Flag(bool),
    Count(usize),
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("worker endpoint disconnected")]
    Disconnected,
}

pub(crate) struct Envelope {
    pub message: Message,
    pub reply: Option<mpsc::Sender<Reply>>,
}

/// The worker's message address. Cloneable and cheap; all clones feed the
/// same pump.
#[derive(Clone)]
pub struct Endpoint {
    tx: mpsc::Sender<Envelope>,
}

impl Endpoint {
    /// Send a message and block until the worker has handled it.
    pub fn send(&self, message: Message) -> Result<Reply, ChannelError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Envelope {
                message,
                reply: Some(reply_tx),
            })
            .map_err(|_| ChannelError::Disconnected)?;
        reply_rx.recv().map_err(|_| ChannelError::Disconnected)
    }

    /// Post a message without waiting for it to be handled.
    pub fn post(&self, message: Message) -> Result<(), ChannelError> {
        self.tx
            .send(Envelope {
                message,
                reply: None,
            })
            .map_err(|_| ChannelError::Disconnected)
    }
}

/// Receiving half, owned by exactly one worker thread.
pub(crate) struct Inbox {
    rx: mpsc::Receiver<Envelope>,
}

impl Inbox {
    /// Next envelope, or `None` once every endpoint clone is dropped.
    pub fn recv(&self) -> Option<Envelope> {
        self.rx.recv().ok()
    }
}

pub(crate) fn channel() -> (Endpoint, Inbox) {
    let (tx, rx) = mpsc::channel();
    (Endpoint { tx }, Inbox { rx })
}
