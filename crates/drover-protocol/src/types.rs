use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::error_codes;

/// Named command parameters. Keys are unique; insertion order carries no
/// meaning.
pub type Parameters = Map<String, Value>;

/// One automation command, deserialized from the opaque string the caller
/// hands to the session. Only the command dispatcher interprets this; the
/// channel treats the serialized form as payload bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn from_json(serialized: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(serialized)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"name\":\"\"}"))
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

/// The uniform result of executing one command.
///
/// `status` 0 means success and `value` carries the result (possibly an
/// explicit null). Any other status is an error code and `value` carries
/// `{error, message}`. Exactly one of the two setters fires per execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: i32,
    pub value: Value,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: error_codes::SUCCESS,
            value: Value::Null,
        }
    }

    /// Record a successful result. An explicit `Value::Null` is a valid
    /// success value, distinct from any error.
    pub fn set_success_response(&mut self, value: impl Into<Value>) {
        self.status = error_codes::SUCCESS;
        self.value = value.into();
    }

    pub fn set_error_response(&mut self, code: i32, message: &str) {
        self.status = code;
        self.value = json!({
            "error": error_codes::error_name(code),
            "message": message,
        });
    }

    pub fn is_success(&self) -> bool {
        self.status == error_codes::SUCCESS
    }

    pub fn from_json(serialized: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(serialized)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"status\":{},\"value\":{{\"error\":\"unknown error\",\"message\":\"response serialization failed\"}}}}",
                error_codes::UNKNOWN_ERROR
            )
        })
    }
}
