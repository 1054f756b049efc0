use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Protocol conversion error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// Image passed inline with the request. Borrowed from the caller for the
/// duration of the call only.
#[derive(Debug, Clone, Copy)]
pub struct InlineImage<'a> {
    pub mime_type: &'a str,
    pub data: &'a [u8],
}

/// A single-turn multimodal request asking for structured output.
#[derive(Debug, Clone)]
pub struct VisionRequest<'a> {
    pub system_instruction: String,
    pub user_instruction: String,
    pub image: InlineImage<'a>,
    /// When set, the provider is asked to constrain its answer to this schema
    /// and to reply with `application/json`.
    pub response_schema: Option<Value>,
}

/// Raw text produced by the model plus whatever metadata the provider exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub text: String,
    pub finish_reason: Option<String>,
}

#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Run one generation call. A single attempt; implementations must not retry.
    async fn generate(&self, request: &VisionRequest<'_>) -> Result<ModelOutput>;

    /// Model identifier used for the call, for logging.
    fn model_name(&self) -> &str;
}
