//! Controller-side errors.
//!
//! Handler failures never surface here; they become error responses on the
//! wire. These errors cover only misuse of the controller itself and the
//! worker endpoint disappearing out from under a call.

use thiserror::Error;

use crate::channel::ChannelError;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The session never completed its initialization handshake, or has
    /// already been shut down. Callers are expected to check for an empty
    /// session id after `initialize`.
    #[error("session has no live worker endpoint")]
    NotInitialized,

    #[error("worker endpoint is gone: {0}")]
    WorkerGone(#[from] ChannelError),

    /// The worker answered a request with the wrong reply shape. This is a
    /// protocol bug, not a recoverable condition.
    #[error("unexpected reply to {request}")]
    UnexpectedReply { request: &'static str },
}
