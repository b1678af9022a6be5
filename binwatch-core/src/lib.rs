//! Core types and service wiring for the binwatch fill-level monitor.

/// Threshold comparison and alert throttling.
pub mod alert;
/// Tunable alert and fill parameters.
pub mod config;
/// Distance-to-fill conversion.
pub mod fill;
/// Per-bin serialization of evaluations.
pub mod lanes;
/// Domain models and identifiers shared by all adapters.
pub mod model;
/// Traits describing the store and notifier interfaces.
pub mod ports;
/// High-level service facade used by reading sources.
pub mod service;

pub use alert::*;
pub use config::*;
pub use fill::*;
pub use lanes::*;
pub use model::*;
pub use ports::*;
pub use service::*;
