//! Optional secondary classifier.
//!
//! The classifier is a separately deployed, narrow CNN service. Its answer is
//! only ever used as context, so every failure here is absorbed: callers get
//! `None` and carry on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::types::{DiagnosisRequest, ReferenceClassification};

/// The classifier requires an animal type; it was trained on dogs.
const DEFAULT_ANIMAL_TYPE: &str = "dog";
const UPLOAD_FILE_NAME: &str = "image.jpg";
const ANALYZE_PATH: &str = "/api/analyze";

#[async_trait]
pub trait ReferenceClassifier: Send + Sync {
    /// Best-effort classification. Never fails; absence is a normal outcome.
    async fn classify(&self, request: &DiagnosisRequest) -> Option<ReferenceClassification>;
}

/// Used when the secondary classifier is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReferenceClassifier;

#[async_trait]
impl ReferenceClassifier for NoReferenceClassifier {
    async fn classify(&self, _request: &DiagnosisRequest) -> Option<ReferenceClassification> {
        None
    }
}

#[derive(Debug, Error)]
enum ReferenceClassifierError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("timed out: {0}")]
    Timeout(reqwest::Error),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response: {0}")]
    MalformedBody(String),

    #[error("could not encode symptoms: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ReferenceClassifierError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReferenceClassifierError::Timeout(err)
        } else {
            ReferenceClassifierError::Transport(err)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    disease: Option<String>,
    confidence: Option<f64>,
}

/// Multipart client for the classifier's `POST /api/analyze` endpoint.
#[derive(Debug, Clone)]
pub struct HttpReferenceClassifier {
    client: Client,
    endpoint: String,
}

impl HttpReferenceClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), ANALYZE_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request_classification(
        &self,
        request: &DiagnosisRequest,
    ) -> Result<ReferenceClassification, ReferenceClassifierError> {
        let image = Part::bytes(request.image_bytes.clone())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(request.mime_type.trim())
            .map_err(ReferenceClassifierError::from_reqwest)?;
        let symptoms = serde_json::to_string(&request.reported_symptoms.to_list())?;
        let form = Form::new()
            .part("image", image)
            .text(
                "animalType",
                request.animal_hint().unwrap_or(DEFAULT_ANIMAL_TYPE).to_string(),
            )
            .text("symptoms", symptoms);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(ReferenceClassifierError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReferenceClassifierError::Status { status, body });
        }

        let body = response
            .bytes()
            .await
            .map_err(ReferenceClassifierError::from_reqwest)?;
        let parsed: ClassifierResponse = serde_json::from_slice(&body)
            .map_err(|e| ReferenceClassifierError::MalformedBody(e.to_string()))?;

        match (parsed.disease, parsed.confidence) {
            (Some(label), Some(confidence_score)) if !label.trim().is_empty() => {
                Ok(ReferenceClassification {
                    label,
                    confidence_score,
                })
            }
            _ => Err(ReferenceClassifierError::MalformedBody(
                "expected `disease` and `confidence` fields".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ReferenceClassifier for HttpReferenceClassifier {
    async fn classify(&self, request: &DiagnosisRequest) -> Option<ReferenceClassification> {
        log::info!("Calling reference classifier at {}", self.endpoint);

        match self.request_classification(request).await {
            Ok(classification) => {
                log::info!(
                    "Reference classifier result: {} ({}% confidence)",
                    classification.label,
                    classification.confidence_score
                );
                Some(classification)
            }
            Err(err) => {
                log::warn!(
                    "Reference classifier unavailable, proceeding without it: {}",
                    err
                );
                None
            }
        }
    }
}
