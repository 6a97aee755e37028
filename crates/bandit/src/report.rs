//! Human-readable and JSON summaries of catalog counters.

use dyntest_core::ExperimentResult;
use serde::Serialize;

use crate::catalog::{Catalog, VariantStats};

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSummary {
    pub key: String,
    pub variants: Vec<VariantStats>,
}

/// Renders catalog state. Pure queries; nothing here mutates counters.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Debug dump: per key in insertion order, the key, one
    /// `Choice: <value> rate: <rate>` line per variant, then a blank line.
    pub fn text(catalog: &Catalog) -> String {
        let mut out = String::new();
        for key in catalog.keys() {
            catalog.with_experiment(key, |experiment| {
                out.push_str(key);
                out.push('\n');
                for variant in experiment.variants() {
                    out.push_str(&format!(
                        "Choice: {} rate: {}\n",
                        variant.value(),
                        variant.chance_of_working()
                    ));
                }
                out.push('\n');
            });
        }
        out
    }

    pub fn summaries(catalog: &Catalog) -> Vec<ExperimentSummary> {
        catalog
            .keys()
            .iter()
            .filter_map(|key| {
                catalog.with_experiment(key, |experiment| ExperimentSummary {
                    key: key.clone(),
                    variants: experiment.variants().iter().map(|v| v.stats()).collect(),
                })
            })
            .collect()
    }

    pub fn json(catalog: &Catalog) -> ExperimentResult<String> {
        Ok(serde_json::to_string_pretty(&Self::summaries(catalog))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Tracker;
    use dyntest_core::ExperimentDefinition;
    use std::sync::Arc;

    #[test]
    fn test_empty_catalog_renders_empty_string() {
        let catalog = Catalog::build(&[]).unwrap();
        assert_eq!(ReportGenerator::text(&catalog), "");
    }

    #[test]
    fn test_single_zero_count_variant() {
        let catalog = Catalog::build(&[ExperimentDefinition::texts("Key", &["Value"])]).unwrap();
        assert_eq!(ReportGenerator::text(&catalog), "Key\nChoice: Value rate: 0\n\n");
    }

    #[test]
    fn test_rates_in_catalog_order() {
        let catalog = Arc::new(
            Catalog::build(&[
                ExperimentDefinition::texts("B", &["x", "y"]),
                ExperimentDefinition::flag("A"),
            ])
            .unwrap(),
        );
        let tracker = Tracker::new(catalog.clone());
        tracker.record_exposure("B", "y").unwrap();
        tracker.record_exposure("B", "y").unwrap();
        tracker.record_conversion("B", "y").unwrap();
        tracker.record_exposure("A", "false").unwrap();
        tracker.record_conversion("A", "false").unwrap();

        assert_eq!(
            ReportGenerator::text(&catalog),
            "B\nChoice: x rate: 0\nChoice: y rate: 0.5\n\n\
             A\nChoice: true rate: 0\nChoice: false rate: 1\n\n"
        );
    }

    #[test]
    fn test_json_summary() {
        let catalog = Catalog::build(&[ExperimentDefinition::flag("Flag")]).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&ReportGenerator::json(&catalog).unwrap()).unwrap();
        assert_eq!(json[0]["key"], "Flag");
        assert_eq!(json[0]["variants"][1]["value"], "false");
        assert_eq!(json[0]["variants"][1]["displayed"], 0);
    }
}
