//! Vision model providers.

pub mod gemini;

pub use gemini::GeminiProvider;
