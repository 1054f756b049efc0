pub mod protocol;
pub mod provider;
pub mod providers;

pub use provider::{InlineImage, LLMError, ModelOutput, Result, VisionProvider, VisionRequest};
pub use providers::GeminiProvider;
