//! Shared types for the dyntest experimentation engine: typed variant values,
//! experiment definitions, configuration, and the error taxonomy.

pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{ExperimentError, ExperimentResult};
pub use types::{Color, ExperimentDefinition, VariantKind, VariantValue};
