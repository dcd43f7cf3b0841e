//! Scoring pipeline
//!
//! Raw provider payloads flow through three stages:
//! - **adapter** — normalize channel payloads into `ModalityScore`s
//! - **fallback** — synthesize bounded substitutes when a provider is
//!   unavailable (`dass21` holds the local questionnaire scoring table)
//! - **composite** — combine present scores into one `CompositeResult`

pub mod adapter;
pub mod composite;
pub mod dass21;
pub mod fallback;

pub use adapter::AdapterError;
pub use composite::CompositeError;
pub use fallback::{FallbackContext, FALLBACK_CONFIDENCE_CEILING};
