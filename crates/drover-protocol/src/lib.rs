#![deny(clippy::all)]

pub mod error_codes;

mod error;
mod types;

pub use error::ProtocolError;
pub use types::Command;
pub use types::Parameters;
pub use types::Response;

pub type Result<T> = std::result::Result<T, ProtocolError>;
