//! Command handlers and the contract they all follow.
//!
//! Each handler validates its named parameters, resolves handles from the
//! registry (browser first, then elements), runs the domain operation, and
//! writes exactly one success or error into the response before returning.
//! Validation and resolution failures become error responses; nothing here
//! propagates as a process-level failure.

mod element;
mod window;

use std::collections::HashMap;

use drover_protocol::{Parameters, Response};

use crate::registry::SessionRegistry;

pub use element::GetElementAttributeHandler;
pub use window::CloseWindowHandler;
pub use window::QuitHandler;

pub trait CommandHandler {
    fn execute(
        &self,
        registry: &mut SessionRegistry,
        parameters: &Parameters,
        response: &mut Response,
    );
}

/// The dispatch table the worker is built with.
pub(crate) fn default_handlers() -> HashMap<&'static str, Box<dyn CommandHandler>> {
    let mut handlers: HashMap<&'static str, Box<dyn CommandHandler>> = HashMap::new();
    handlers.insert("getElementAttribute", Box::new(GetElementAttributeHandler));
    handlers.insert("close", Box::new(CloseWindowHandler));
    handlers.insert("quit", Box::new(QuitHandler));
    handlers
}
