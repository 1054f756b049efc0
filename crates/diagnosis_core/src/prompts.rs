//! System and user instructions for the vision model.

use crate::catalog;
use crate::schema;
use crate::types::{
    AnimalKind, ReferenceClassification, ReportedSymptoms, HEALTHY_DISEASE,
    INVALID_ANIMAL_DISEASE, NOT_APPLICABLE, UNSUPPORTED_ANIMAL_SYMPTOMS,
};

const NO_SYMPTOMS: &str = "None specified";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_instruction: String,
    pub user_instruction: String,
}

fn reference_note(reference: &ReferenceClassification) -> String {
    format!(
        "Reference only, do not treat as ground truth: a basic CNN classifier with \
         limited training data (75 dog images: bacterial, fungal, healthy) suggested \
         \"{}\" with {}% confidence. Your analysis is the primary diagnostic assessment.",
        reference.label, reference.confidence_score
    )
}

fn symptoms_text(symptoms: &ReportedSymptoms) -> String {
    let list = symptoms.to_list();
    if list.is_empty() {
        NO_SYMPTOMS.to_string()
    } else {
        list.join(", ")
    }
}

fn system_instruction(
    hinted_kind: Option<AnimalKind>,
    reference: Option<&ReferenceClassification>,
) -> String {
    let unsupported_symptoms = serde_json::to_string(UNSUPPORTED_ANIMAL_SYMPTOMS)
        .unwrap_or_else(|_| format!("[\"{}\"]", UNSUPPORTED_ANIMAL_SYMPTOMS[0]));
    let allowed = catalog::allowed_diseases(hinted_kind).join(", ");
    let reference_context = match reference {
        Some(reference) => reference_note(reference),
        None => "No reference classification is available. Perform your analysis \
                 independently as the primary diagnostic tool."
            .to_string(),
    };

    format!(
        r#"You are a veterinary diagnostic specialist for skin conditions in dogs, cats and cattle. Analyze the provided image and return a concise diagnosis.

Follow these two steps in order:
1. Identify the animal in the image and classify it as exactly one of: dog, cat, cow, other. Report it in "detectedAnimal".
2. Only if the animal is a dog, cat or cow, diagnose its skin condition.

If the animal is "other", do not diagnose. Return "disease": "{invalid}", "severity": "{na}", "urgency": "{na}", "symptoms": {unsupported_symptoms}, and explain in "description" which animal you saw.
Do not hallucinate a supported animal. If the image clearly shows something that is not a dog, cat or cow, the answer is "other" even when a different animal type was reported.

Return ONLY valid JSON with these fields:
{fields}

If the skin looks healthy with no visible lesions, irritation or abnormalities, use "disease": "{healthy}" and "severity": "{na}". Do not assume a disease is present.

When the animal matches the reported type, the "disease" field MUST be one of these exact names: {allowed}
Do not use variations, abbreviations, or combine disease names.

Keep every field brief: singular, general disease names and at most three sentences of description.

{reference_context}"#,
        invalid = INVALID_ANIMAL_DISEASE,
        na = NOT_APPLICABLE,
        unsupported_symptoms = unsupported_symptoms,
        fields = schema::describe_fields(),
        healthy = HEALTHY_DISEASE,
        allowed = allowed,
        reference_context = reference_context,
    )
}

fn user_instruction(
    animal_type: Option<&str>,
    symptoms: &ReportedSymptoms,
    reference: Option<&ReferenceClassification>,
) -> String {
    let animal = animal_type.unwrap_or("not specified");
    let reference_line = match reference {
        Some(reference) => format!(
            "Reference classifier (reference only): {} ({}% confidence)",
            reference.label, reference.confidence_score
        ),
        None => "No reference classification available".to_string(),
    };

    format!(
        "Analyze this image for skin conditions.\n\n\
         Reported animal type: {animal}\n\
         Reported symptoms: {symptoms}\n\
         {reference_line}\n\n\
         First identify whether the animal in the image is a dog, cat or cow. \
         If it is not one of these, return '{invalid}' and do not diagnose. \
         Otherwise provide a concise veterinary diagnosis based on what you can see.",
        animal = animal,
        symptoms = symptoms_text(symptoms),
        reference_line = reference_line,
        invalid = INVALID_ANIMAL_DISEASE,
    )
}

/// Build the instruction pair for one diagnosis call. Pure: the same inputs
/// always give the same output.
pub fn build_prompts(
    animal_type: Option<&str>,
    symptoms: &ReportedSymptoms,
    reference: Option<&ReferenceClassification>,
) -> PromptPair {
    let animal_type = animal_type.map(str::trim).filter(|a| !a.is_empty());
    let hinted_kind = animal_type.and_then(AnimalKind::from_hint);

    PromptPair {
        system_instruction: system_instruction(hinted_kind, reference),
        user_instruction: user_instruction(animal_type, symptoms, reference),
    }
}
