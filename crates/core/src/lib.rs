//! Classification and normalization of third-party webhook payloads into
//! canonical [`IncidentSignal`](types::IncidentSignal) records.
//!
//! The crate is synchronous and side-effect free apart from `tracing` debug
//! events. Transport, persistence and configuration live elsewhere.

pub mod normalizer;
pub mod sources;
pub mod types;

pub use normalizer::{normalize, Normalizer};
pub use types::{IncidentSignal, Labels, NormalizeOptions, TriggerKind};
