//! Error types for protocol conversion.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid content format: {0}")]
    InvalidContent(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Prompt blocked by provider: {0}")]
    Blocked(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
