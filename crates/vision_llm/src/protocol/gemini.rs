//! Google Gemini protocol conversion implementation.
//!
//! Gemini's `generateContent` format:
//! - Messages are called "contents", each made of "parts"
//! - Images travel as `inlineData` parts carrying base64 bytes
//! - System instructions are separate from the contents
//! - Structured output is requested through `generationConfig`
//!
//! # Example Gemini Request
//! ```json
//! {
//!   "systemInstruction": { "parts": [{"text": "You are a vet"}] },
//!   "contents": [
//!     {
//!       "role": "user",
//!       "parts": [
//!         {"text": "Analyze this dog"},
//!         {"inlineData": {"mimeType": "image/jpeg", "data": "<base64>"}}
//!       ]
//!     }
//!   ],
//!   "generationConfig": {
//!     "responseMimeType": "application/json",
//!     "responseSchema": { "type": "OBJECT", "properties": {} }
//!   }
//! }
//! ```

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{FromProvider, ProtocolError, ProtocolResult, ToProvider};
use crate::provider::{ModelOutput, VisionRequest};

// ============================================================================
// Gemini API Types
// ============================================================================

/// Gemini request format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

/// Gemini message/content format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// "user" or "model". Omitted for system instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Gemini content part
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

/// Base64 payload embedded in a request part
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// Gemini response format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
}

/// Gemini response candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Absent when the candidate was stopped by a safety filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

// ============================================================================
// Internal → Gemini (ToProvider)
// ============================================================================

impl ToProvider<GeminiRequest> for VisionRequest<'_> {
    fn to_provider(&self) -> ProtocolResult<GeminiRequest> {
        if self.image.mime_type.trim().is_empty() {
            return Err(ProtocolError::MissingField("image mime type".to_string()));
        }

        let image_part = GeminiPart {
            text: None,
            inline_data: Some(GeminiInlineData {
                mime_type: self.image.mime_type.to_string(),
                data: general_purpose::STANDARD.encode(self.image.data),
            }),
        };

        let generation_config = self
            .response_schema
            .as_ref()
            .map(|schema| GeminiGenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.clone()),
            });

        Ok(GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::text(self.user_instruction.clone()), image_part],
            }],
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(self.system_instruction.clone())],
            }),
            generation_config,
        })
    }
}

// ============================================================================
// Gemini → Internal (FromProvider)
// ============================================================================

impl FromProvider<GeminiResponse> for ModelOutput {
    fn from_provider(response: GeminiResponse) -> ProtocolResult<Self> {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone())
        {
            return Err(ProtocolError::Blocked(reason));
        }

        // Only the first candidate is used; we never ask for more than one.
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProtocolError::MissingField("candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProtocolError::InvalidContent(format!(
                "candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(ModelOutput {
            text,
            finish_reason: candidate.finish_reason,
        })
    }
}
