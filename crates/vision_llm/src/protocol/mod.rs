//! Protocol conversion traits and types.
//!
//! Provider wire types convert to and from the crate's own request/response
//! types ([`VisionRequest`](crate::VisionRequest), [`ModelOutput`](crate::ModelOutput)).

mod errors;
pub mod gemini;

pub use errors::{ProtocolError, ProtocolResult};

/// Trait for converting provider-specific types to internal types.
pub trait FromProvider<T>: Sized {
    fn from_provider(value: T) -> ProtocolResult<Self>;
}

/// Trait for converting internal types to provider-specific types.
pub trait ToProvider<T>: Sized {
    fn to_provider(&self) -> ProtocolResult<T>;
}
