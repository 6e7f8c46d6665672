use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed command: {0}")]
    MalformedCommand(#[from] serde_json::Error),
}
