//! Numeric status codes carried in every response.
//!
//! The numbers are fixed by the wire protocol the remote end speaks; they
//! must stay in sync with the clients' error-code tables.

pub const SUCCESS: i32 = 0;

// Handle resolution
pub const NO_SUCH_ELEMENT: i32 = 7;
pub const STALE_ELEMENT_REFERENCE: i32 = 10;
pub const NO_SUCH_WINDOW: i32 = 23;

// Dispatch and validation
pub const UNKNOWN_COMMAND: i32 = 9;
pub const UNKNOWN_ERROR: i32 = 13;
pub const INVALID_ARGUMENT: i32 = 61;

/// The stable wire name for a status code, used in the `error` field of an
/// error response. Codes without a dedicated name (handler-specific domain
/// codes surfaced verbatim) fall back to "unknown error".
pub fn error_name(code: i32) -> &'static str {
    match code {
        NO_SUCH_ELEMENT => "no such element",
        UNKNOWN_COMMAND => "unknown command",
        STALE_ELEMENT_REFERENCE => "stale element reference",
        NO_SUCH_WINDOW => "no such window",
        INVALID_ARGUMENT => "invalid argument",
        _ => "unknown error",
    }
}
