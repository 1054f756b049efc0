//! Skin-disease diagnosis pipeline: prompt construction, structured-output
//! validation, an optional reference classifier and the orchestrating
//! [`DiagnosisService`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod prompts;
pub mod reference;
pub mod schema;
pub mod service;
pub mod types;

pub use config::{ConfigError, DiagnosisConfig};
pub use error::{DiagnosisErrorKind, DiagnosisServiceError};
pub use prompts::{build_prompts, PromptPair};
pub use reference::{HttpReferenceClassifier, NoReferenceClassifier, ReferenceClassifier};
pub use schema::SchemaValidationError;
pub use service::DiagnosisService;
pub use types::*;
