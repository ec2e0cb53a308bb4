//! Shared types, configuration, and normalization heuristics for the
//! PulseNorth ingestion and analytics engine.

pub mod config;
pub mod error;
pub mod gate;
pub mod relevance;
pub mod types;

pub use config::Config;
pub use error::PulseError;
pub use gate::{is_accepted, GateThresholds};
pub use types::{
    AcquisitionMode, Candidate, Category, Development, HealthEntry, Language, RunStatus,
    SourceDefinition, SourceType,
};
