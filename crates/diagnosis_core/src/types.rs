use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Disease name the model must use when the skin shows no sign of disease.
pub const HEALTHY_DISEASE: &str = "Healthy";
/// Disease name for images that do not show a dog, cat or cow.
pub const INVALID_ANIMAL_DISEASE: &str = "Invalid Animal";
/// Severity and urgency value when no grading applies.
pub const NOT_APPLICABLE: &str = "N/A";
/// Symptom list used for unsupported animals.
pub const UNSUPPORTED_ANIMAL_SYMPTOMS: &[&str] = &["Not applicable: unsupported animal"];

pub const PROVENANCE_WITH_REFERENCE: &str = "Secondary Vision (with CNN reference)";
pub const PROVENANCE_STANDALONE: &str = "Secondary Vision (standalone)";
pub const REFERENCE_DISCLAIMER: &str = "Limited CNN model used only for reference";

/// Closed set of animal kinds the model may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalKind {
    Dog,
    Cat,
    Cow,
    Other,
}

impl AnimalKind {
    pub const ALL: [AnimalKind; 4] = [
        AnimalKind::Dog,
        AnimalKind::Cat,
        AnimalKind::Cow,
        AnimalKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalKind::Dog => "dog",
            AnimalKind::Cat => "cat",
            AnimalKind::Cow => "cow",
            AnimalKind::Other => "other",
        }
    }

    /// Loose match of a caller-supplied hint ("Dog", "my cattle", ...).
    /// Returns `None` when the hint names none of the supported kinds.
    pub fn from_hint(hint: &str) -> Option<AnimalKind> {
        let normalized = hint.trim().to_ascii_lowercase();
        if normalized.contains("dog") {
            Some(AnimalKind::Dog)
        } else if normalized.contains("cat") && !normalized.contains("cattle") {
            Some(AnimalKind::Cat)
        } else if normalized.contains("cow") || normalized.contains("cattle") {
            Some(AnimalKind::Cow)
        } else {
            None
        }
    }
}

impl fmt::Display for AnimalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnimalKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown animal kind '{s}'"))
    }
}

/// Symptoms as reported by the caller: either a list or one free-text string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportedSymptoms {
    List(Vec<String>),
    Text(String),
}

impl Default for ReportedSymptoms {
    fn default() -> Self {
        ReportedSymptoms::List(Vec::new())
    }
}

impl ReportedSymptoms {
    /// Interpret a form field value. A JSON array of strings becomes a list,
    /// anything else is kept as free text.
    pub fn parse_form_value(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
                return ReportedSymptoms::List(list);
            }
        }
        ReportedSymptoms::Text(trimmed.to_string())
    }

    /// Non-blank entries, in order.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            ReportedSymptoms::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            ReportedSymptoms::Text(text) if text.trim().is_empty() => Vec::new(),
            ReportedSymptoms::Text(text) => vec![text.trim().to_string()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_list().is_empty()
    }
}

impl From<Vec<String>> for ReportedSymptoms {
    fn from(items: Vec<String>) -> Self {
        ReportedSymptoms::List(items)
    }
}

impl From<&str> for ReportedSymptoms {
    fn from(text: &str) -> Self {
        ReportedSymptoms::Text(text.to_string())
    }
}

/// Input to the diagnosis pipeline.
#[derive(Debug, Clone)]
pub struct DiagnosisRequest {
    pub image_bytes: Vec<u8>,
    pub mime_type: String,
    pub animal_type: Option<String>,
    pub reported_symptoms: ReportedSymptoms,
}

impl DiagnosisRequest {
    pub fn new(image_bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            image_bytes: image_bytes.into(),
            mime_type: mime_type.into(),
            animal_type: None,
            reported_symptoms: ReportedSymptoms::default(),
        }
    }

    pub fn with_animal_type(mut self, animal_type: impl Into<String>) -> Self {
        self.animal_type = Some(animal_type.into());
        self
    }

    pub fn with_symptoms(mut self, symptoms: impl Into<ReportedSymptoms>) -> Self {
        self.reported_symptoms = symptoms.into();
        self
    }

    /// The animal hint, if the caller gave a non-blank one.
    pub fn animal_hint(&self) -> Option<&str> {
        self.animal_type
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }
}

/// Result of the optional secondary classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceClassification {
    #[serde(rename = "disease")]
    pub label: String,
    #[serde(rename = "confidence")]
    pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub medication: String,
    pub dosage: String,
    pub topical: String,
    #[serde(rename = "additional")]
    pub additional_care: Vec<String>,
}

/// Descriptive per-category probabilities. Values need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityBreakdown {
    #[serde(rename = "Healthy")]
    pub healthy: f64,
    #[serde(rename = "Bacterial")]
    pub bacterial: f64,
    #[serde(rename = "Fungal")]
    pub fungal: f64,
    #[serde(rename = "Other", default, skip_serializing_if = "Option::is_none")]
    pub other: Option<f64>,
}

/// Model output after it passed schema validation, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(
        rename = "detectedAnimal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detected_animal_kind: Option<AnimalKind>,
    #[serde(rename = "disease")]
    pub disease_name: String,
    #[serde(rename = "confidence")]
    pub confidence_score: f64,
    #[serde(rename = "severity")]
    pub severity_level: String,
    pub description: String,
    pub symptoms: Vec<String>,
    pub treatment: Treatment,
    pub urgency: String,
    #[serde(rename = "allProbabilities")]
    pub probability_breakdown: ProbabilityBreakdown,
}

impl Diagnosis {
    pub fn is_unsupported_animal(&self) -> bool {
        self.detected_animal_kind == Some(AnimalKind::Other)
    }

    /// Force the unsupported-animal sentinels onto this diagnosis.
    pub fn apply_unsupported_animal_sentinels(&mut self) {
        self.disease_name = INVALID_ANIMAL_DISEASE.to_string();
        self.severity_level = NOT_APPLICABLE.to_string();
        self.urgency = NOT_APPLICABLE.to_string();
        self.symptoms = UNSUPPORTED_ANIMAL_SYMPTOMS
            .iter()
            .map(|s| s.to_string())
            .collect();
    }
}

/// Echo of the reference classification attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceNote {
    pub disease: String,
    pub confidence: f64,
    pub note: String,
}

impl From<ReferenceClassification> for ReferenceNote {
    fn from(reference: ReferenceClassification) -> Self {
        Self {
            disease: reference.label,
            confidence: reference.confidence_score,
            note: REFERENCE_DISCLAIMER.to_string(),
        }
    }
}

/// Final, enriched result returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    #[serde(flatten)]
    pub diagnosis: Diagnosis,
    #[serde(rename = "analysisTime")]
    pub analysis_timestamp: String,
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
    #[serde(rename = "processingTimeMs")]
    pub processing_duration_ms: u64,
    #[serde(rename = "modelUsed")]
    pub model_provenance: String,
    #[serde(rename = "cnnReference")]
    pub reference_note: Option<ReferenceNote>,
}
