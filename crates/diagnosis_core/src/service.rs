//! Diagnosis orchestration.
//!
//! One call runs: request check → reference lookup (optional, never fails) → prompt
//! construction → vision model call → schema validation → enrichment.
//! The two external calls are sequential because the reference answer is
//! part of the model's prompt. Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, Utc};
use serde_json::Value;
use vision_llm::{GeminiProvider, InlineImage, VisionProvider, VisionRequest};

use crate::config::{ConfigError, DiagnosisConfig};
use crate::error::DiagnosisServiceError;
use crate::prompts::build_prompts;
use crate::reference::{HttpReferenceClassifier, NoReferenceClassifier, ReferenceClassifier};
use crate::schema::{self, SchemaValidationError};
use crate::types::{
    Diagnosis, DiagnosisRequest, DiagnosisResult, ReferenceClassification, ReferenceNote,
    PROVENANCE_STANDALONE, PROVENANCE_WITH_REFERENCE,
};

pub struct DiagnosisService {
    model: Arc<dyn VisionProvider>,
    reference: Arc<dyn ReferenceClassifier>,
    response_schema: Value,
}

impl DiagnosisService {
    pub fn new(model: Arc<dyn VisionProvider>, reference: Arc<dyn ReferenceClassifier>) -> Self {
        Self {
            model,
            reference,
            response_schema: schema::response_schema(),
        }
    }

    /// Build the service from validated configuration. Fails when the model
    /// credential is missing, so a misconfigured service never starts.
    pub fn from_config(config: &DiagnosisConfig) -> Result<Self, ConfigError> {
        let api_key = config.validate()?;

        let model = GeminiProvider::new(api_key)
            .with_base_url(config.api_base.as_str())
            .with_model(config.model.as_str());

        let reference: Arc<dyn ReferenceClassifier> = if config.reference_classifier_enabled {
            Arc::new(HttpReferenceClassifier::new(
                &config.reference_classifier_url,
                config.reference_timeout(),
            )?)
        } else {
            log::info!("Reference classifier disabled");
            Arc::new(NoReferenceClassifier)
        };

        log::info!(
            "Diagnosis service ready: model={}, reference classifier={}",
            config.model,
            if config.reference_classifier_enabled {
                config.reference_classifier_url.as_str()
            } else {
                "disabled"
            }
        );

        Ok(Self::new(Arc::new(model), reference))
    }

    pub async fn diagnose(
        &self,
        request: &DiagnosisRequest,
    ) -> Result<DiagnosisResult, DiagnosisServiceError> {
        let started = Instant::now();
        log::info!(
            "Diagnosis requested: animal_type={:?}, symptoms={:?}, image={} bytes",
            request.animal_hint(),
            request.reported_symptoms.to_list(),
            request.image_bytes.len()
        );

        if let Err(err) = check_request(request) {
            log::warn!("Rejecting diagnosis request: {}", err.message());
            return Err(err);
        }

        let reference = self.reference.classify(request).await;

        let diagnosis = match self.primary_diagnosis(request, reference.as_ref()).await {
            Ok(diagnosis) => diagnosis,
            Err(err) => {
                log::error!("Error in diagnosis pipeline ({:?}): {}", err.kind(), err);
                return Err(err);
            }
        };

        let result = enrich(diagnosis, reference, started);
        log::info!(
            "Diagnosis completed: disease='{}', confidence={}, detected={:?}, {}ms, {}",
            result.diagnosis.disease_name,
            result.diagnosis.confidence_score,
            result.diagnosis.detected_animal_kind,
            result.processing_duration_ms,
            result.model_provenance
        );
        Ok(result)
    }

    async fn primary_diagnosis(
        &self,
        request: &DiagnosisRequest,
        reference: Option<&ReferenceClassification>,
    ) -> Result<Diagnosis, DiagnosisServiceError> {
        let prompts = build_prompts(
            request.animal_hint(),
            &request.reported_symptoms,
            reference,
        );
        let vision_request = VisionRequest {
            system_instruction: prompts.system_instruction,
            user_instruction: prompts.user_instruction,
            image: InlineImage {
                mime_type: request.mime_type.trim(),
                data: &request.image_bytes,
            },
            response_schema: Some(self.response_schema.clone()),
        };

        log::info!(
            "Performing primary diagnosis with {}",
            self.model.model_name()
        );
        let output = self.model.generate(&vision_request).await?;

        let raw = decode_model_output(&output.text)?;
        Ok(schema::validate(&raw)?)
    }
}

fn check_request(request: &DiagnosisRequest) -> Result<(), DiagnosisServiceError> {
    if request.image_bytes.is_empty() {
        return Err(DiagnosisServiceError::malformed_request("image is empty"));
    }
    if request.mime_type.trim().is_empty() {
        return Err(DiagnosisServiceError::malformed_request(
            "image mime type is missing",
        ));
    }
    Ok(())
}

/// Structured-output mode returns bare JSON; anything else is a shape error.
fn decode_model_output(text: &str) -> Result<Value, DiagnosisServiceError> {
    serde_json::from_str(text.trim()).map_err(|err| {
        log::debug!("Undecodable model output: {}", text);
        DiagnosisServiceError::from(SchemaValidationError {
            field: "$".to_string(),
            expected: "JSON document",
            found: if err.is_eof() {
                "truncated JSON"
            } else {
                "invalid JSON"
            },
        })
    })
}

fn enrich(
    mut diagnosis: Diagnosis,
    reference: Option<ReferenceClassification>,
    started: Instant,
) -> DiagnosisResult {
    if diagnosis.is_unsupported_animal() {
        diagnosis.apply_unsupported_animal_sentinels();
    }

    let completed_at = Utc::now();
    let processing_duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let model_provenance = if reference.is_some() {
        PROVENANCE_WITH_REFERENCE
    } else {
        PROVENANCE_STANDALONE
    };

    DiagnosisResult {
        diagnosis,
        analysis_timestamp: completed_at
            .with_timezone(&Local)
            .format("%-I:%M:%S %p")
            .to_string(),
        completed_at,
        processing_duration_ms,
        model_provenance: model_provenance.to_string(),
        reference_note: reference.map(ReferenceNote::from),
    }
}
