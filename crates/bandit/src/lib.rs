//! Epsilon-greedy bandit engine: variant records and catalog, arm selection,
//! exposure/conversion tracking, and report generation.

pub mod catalog;
pub mod engine;
pub mod report;
pub mod selector;
pub mod tracker;

pub use catalog::{Catalog, Experiment, VariantRecord, VariantStats};
pub use engine::{ExperimentEngine, InitOutcome};
pub use report::ReportGenerator;
pub use selector::{BanditSelector, Branch, Selection};
pub use tracker::Tracker;
