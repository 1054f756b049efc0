use serde::Serialize;
use thiserror::Error;
use vision_llm::LLMError;

use crate::schema::SchemaValidationError;

/// Why a diagnosis failed. Lets callers tell bad model output apart from
/// transport failures without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisErrorKind {
    /// The request could not be sent to the model at all.
    MalformedRequest,
    /// Network error, timeout or non-success response from the model.
    ModelCall,
    /// The model answered, but not in the diagnosis shape.
    SchemaValidation,
}

/// The only error callers of `diagnose` ever see.
#[derive(Debug, Error)]
#[error("Diagnosis service unavailable: {message}")]
pub struct DiagnosisServiceError {
    kind: DiagnosisErrorKind,
    message: String,
}

impl DiagnosisServiceError {
    pub fn new(kind: DiagnosisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(DiagnosisErrorKind::MalformedRequest, message)
    }

    pub fn kind(&self) -> DiagnosisErrorKind {
        self.kind
    }

    /// Message of the underlying cause, without the generic prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LLMError> for DiagnosisServiceError {
    fn from(err: LLMError) -> Self {
        Self::new(DiagnosisErrorKind::ModelCall, err.to_string())
    }
}

impl From<SchemaValidationError> for DiagnosisServiceError {
    fn from(err: SchemaValidationError) -> Self {
        Self::new(DiagnosisErrorKind::SchemaValidation, err.to_string())
    }
}
