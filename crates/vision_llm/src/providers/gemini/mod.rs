//! Google Gemini provider implementation.

use async_trait::async_trait;
use reqwest::Client;

use crate::protocol::gemini::{GeminiRequest, GeminiResponse};
use crate::protocol::{FromProvider, ToProvider};
use crate::provider::{LLMError, ModelOutput, Result, VisionProvider, VisionRequest};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Set a custom base URL (e.g., for proxies or alternative endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name (e.g., "gemini-2.5-flash").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    async fn generate(&self, request: &VisionRequest<'_>) -> Result<ModelOutput> {
        let body: GeminiRequest = request.to_provider()?;

        log::debug!(
            "Gemini generateContent: model={}, image={} bytes ({}), schema={}",
            self.model,
            request.image.data.len(),
            request.image.mime_type,
            request.response_schema.is_some()
        );

        // Query param authentication; the key must stay out of the logs above.
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(LLMError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.map_err(LLMError::Http)?;

            if status == 401 || status == 403 {
                return Err(LLMError::Auth(format!(
                    "Gemini authentication failed: {}. Please check your API key.",
                    text
                )));
            }

            return Err(LLMError::Api(format!(
                "Gemini API error: HTTP {}: {}",
                status, text
            )));
        }

        let parsed: GeminiResponse = response.json().await.map_err(LLMError::Http)?;
        let output = ModelOutput::from_provider(parsed)?;

        log::debug!(
            "Gemini response received: {} chars, finish_reason={:?}",
            output.text.len(),
            output.finish_reason
        );

        Ok(output)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
