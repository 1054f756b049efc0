//! Structured diagnosis contract.
//!
//! The field tables below are the only description of what a diagnosis looks
//! like. [`validate`] checks model output against them, [`response_schema`]
//! renders them for the model's structured-output mode, and the prompt
//! builder lists them in the system instruction.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::types::Diagnosis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    StringArray,
    Enum(&'static [&'static str]),
    Object(&'static [FieldSpec]),
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::StringArray => "array of strings",
            FieldKind::Enum(_) => "one of the allowed values",
            FieldKind::Object(_) => "object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

const ANIMAL_KINDS: &[&str] = &["dog", "cat", "cow", "other"];

pub const TREATMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "medication",
        kind: FieldKind::String,
        required: true,
        description: "recommended medication, or 'None required' if healthy",
    },
    FieldSpec {
        name: "dosage",
        kind: FieldKind::String,
        required: true,
        description: "brief dosage instructions, or 'Not applicable' if healthy",
    },
    FieldSpec {
        name: "topical",
        kind: FieldKind::String,
        required: true,
        description: "topical treatment, or 'None needed' if healthy",
    },
    FieldSpec {
        name: "additional",
        kind: FieldKind::StringArray,
        required: true,
        description: "concise care instructions, or ['Routine care'] if healthy",
    },
];

pub const PROBABILITY_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "Healthy",
        kind: FieldKind::Number,
        required: true,
        description: "probability the skin is healthy",
    },
    FieldSpec {
        name: "Bacterial",
        kind: FieldKind::Number,
        required: true,
        description: "probability of a bacterial condition",
    },
    FieldSpec {
        name: "Fungal",
        kind: FieldKind::Number,
        required: true,
        description: "probability of a fungal condition",
    },
    FieldSpec {
        name: "Other",
        kind: FieldKind::Number,
        required: false,
        description: "probability of any other condition",
    },
];

/// Top-level diagnosis fields, in the order they are checked.
pub const DIAGNOSIS_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "disease",
        kind: FieldKind::String,
        required: true,
        description: "single general disease name, 'Healthy' if no disease is visible, \
                      or 'Invalid Animal' if the animal is not a dog, cat or cow",
    },
    FieldSpec {
        name: "confidence",
        kind: FieldKind::Number,
        required: true,
        description: "confidence score between 0 and 100",
    },
    FieldSpec {
        name: "severity",
        kind: FieldKind::String,
        required: true,
        description: "mild, moderate or severe; 'N/A' if healthy or unsupported animal",
    },
    FieldSpec {
        name: "description",
        kind: FieldKind::String,
        required: true,
        description: "concise description of the condition (max 3 sentences)",
    },
    FieldSpec {
        name: "symptoms",
        kind: FieldKind::StringArray,
        required: true,
        description: "visible symptoms; ['No symptoms observed'] if healthy, \
                      ['Not applicable: unsupported animal'] for unsupported animals",
    },
    FieldSpec {
        name: "treatment",
        kind: FieldKind::Object(TREATMENT_FIELDS),
        required: true,
        description: "treatment plan",
    },
    FieldSpec {
        name: "urgency",
        kind: FieldKind::String,
        required: true,
        description: "brief urgency assessment; 'N/A' for unsupported animals",
    },
    FieldSpec {
        name: "detectedAnimal",
        kind: FieldKind::Enum(ANIMAL_KINDS),
        required: false,
        description: "the animal actually visible in the image: dog, cat, cow or other",
    },
    FieldSpec {
        name: "allProbabilities",
        kind: FieldKind::Object(PROBABILITY_FIELDS),
        required: true,
        description: "differential probabilities for the main categories",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema validation failed at `{field}`: expected {expected}, found {found}")]
pub struct SchemaValidationError {
    /// Dotted path of the first offending field, `$` for the root.
    pub field: String,
    pub expected: &'static str,
    pub found: &'static str,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn check_value(value: &Value, kind: FieldKind, path: &str) -> Result<(), SchemaValidationError> {
    let mismatch = |found: &'static str| SchemaValidationError {
        field: path.to_string(),
        expected: kind.expected(),
        found,
    };

    match kind {
        FieldKind::String if value.is_string() => Ok(()),
        FieldKind::Number if value.is_number() => Ok(()),
        FieldKind::StringArray => {
            let items = value.as_array().ok_or_else(|| mismatch(type_name(value)))?;
            for (index, item) in items.iter().enumerate() {
                if !item.is_string() {
                    return Err(SchemaValidationError {
                        field: format!("{path}[{index}]"),
                        expected: "string",
                        found: type_name(item),
                    });
                }
            }
            Ok(())
        }
        FieldKind::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => Ok(()),
            Some(_) => Err(mismatch("value outside the allowed set")),
            None => Err(mismatch(type_name(value))),
        },
        FieldKind::Object(fields) => {
            let object = value.as_object().ok_or_else(|| mismatch(type_name(value)))?;
            check_fields(object, fields, path)
        }
        _ => Err(mismatch(type_name(value))),
    }
}

fn check_fields(
    object: &Map<String, Value>,
    fields: &[FieldSpec],
    parent: &str,
) -> Result<(), SchemaValidationError> {
    for field in fields {
        let path = join_path(parent, field.name);
        match object.get(field.name) {
            None | Some(Value::Null) if !field.required => {}
            None => {
                return Err(SchemaValidationError {
                    field: path,
                    expected: field.kind.expected(),
                    found: "missing",
                })
            }
            Some(value) => check_value(value, field.kind, &path)?,
        }
    }
    Ok(())
}

/// Check a decoded model response against the diagnosis contract and turn it
/// into a typed [`Diagnosis`]. Unknown extra fields are ignored.
pub fn validate(value: &Value) -> Result<Diagnosis, SchemaValidationError> {
    let object = value.as_object().ok_or_else(|| SchemaValidationError {
        field: "$".to_string(),
        expected: "object",
        found: type_name(value),
    })?;

    check_fields(object, DIAGNOSIS_FIELDS, "")?;

    // The structure is known to match here; a failure would mean the tables
    // and the `Diagnosis` type disagree.
    serde_json::from_value(value.clone()).map_err(|_| SchemaValidationError {
        field: "$".to_string(),
        expected: "diagnosis object",
        found: "incompatible structure",
    })
}

fn render_kind(kind: FieldKind, description: &str) -> Value {
    match kind {
        FieldKind::String => json!({ "type": "STRING", "description": description }),
        FieldKind::Number => json!({ "type": "NUMBER", "description": description }),
        FieldKind::StringArray => json!({
            "type": "ARRAY",
            "items": { "type": "STRING" },
            "description": description,
        }),
        FieldKind::Enum(values) => json!({
            "type": "STRING",
            "enum": values,
            "description": description,
        }),
        FieldKind::Object(fields) => {
            let mut schema = render_object(fields);
            schema["description"] = Value::String(description.to_string());
            schema
        }
    }
}

fn render_object(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|field| {
            (
                field.name.to_string(),
                render_kind(field.kind, field.description),
            )
        })
        .collect();
    let required: Vec<&str> = fields
        .iter()
        .filter(|field| field.required)
        .map(|field| field.name)
        .collect();
    let ordering: Vec<&str> = fields.iter().map(|field| field.name).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": ordering,
    })
}

/// The diagnosis contract in the OpenAPI-subset form accepted by Gemini's
/// `generationConfig.responseSchema`.
pub fn response_schema() -> Value {
    render_object(DIAGNOSIS_FIELDS)
}

/// One line per field, used verbatim in the system instruction.
pub fn describe_fields() -> String {
    fn describe(fields: &[FieldSpec], indent: usize, out: &mut Vec<String>) {
        for field in fields {
            let optional = if field.required { "" } else { " (optional)" };
            out.push(format!(
                "{:indent$}- \"{}\" ({}){}: {}",
                "",
                field.name,
                field.kind.expected(),
                optional,
                field.description,
                indent = indent
            ));
            if let FieldKind::Object(children) = field.kind {
                describe(children, indent + 2, out);
            }
        }
    }

    let mut lines = Vec::new();
    describe(DIAGNOSIS_FIELDS, 0, &mut lines);
    lines.join("\n")
}
