//! Exposure and conversion bookkeeping.

use std::sync::Arc;

use dyntest_core::{ExperimentError, ExperimentResult};
use tracing::debug;

use crate::catalog::{Catalog, VariantRecord, VariantStats};

/// Applies exposure/conversion events to catalog counters.
///
/// Values are matched by exact string equality against the stored canonical
/// value. Events for unknown keys or values never create records.
#[derive(Debug, Clone)]
pub struct Tracker {
    catalog: Arc<Catalog>,
}

impl Tracker {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn record_exposure(&self, key: &str, value: &str) -> ExperimentResult<()> {
        self.update(key, value, |record| {
            record.record_exposure();
            Ok(())
        })?;
        debug!(key, value, "exposure recorded");
        Ok(())
    }

    pub fn record_conversion(&self, key: &str, value: &str) -> ExperimentResult<()> {
        self.update(key, value, |record| {
            if record.record_conversion() {
                Ok(())
            } else {
                Err(ExperimentError::ConversionExceedsExposure {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
        })?;
        debug!(key, value, "conversion recorded");
        Ok(())
    }

    /// Counters for every variant of `key`, in stored order.
    pub fn stats(&self, key: &str) -> ExperimentResult<Vec<VariantStats>> {
        self.catalog
            .with_experiment(key, |experiment| {
                experiment.variants().iter().map(|v| v.stats()).collect()
            })
            .ok_or_else(|| ExperimentError::UnknownKey(key.to_string()))
    }

    fn update(
        &self,
        key: &str,
        value: &str,
        apply: impl FnOnce(&mut VariantRecord) -> ExperimentResult<()>,
    ) -> ExperimentResult<()> {
        self.catalog
            .with_experiment_mut(key, |experiment| match experiment.variant_mut(value) {
                Some(record) => apply(record),
                None => Err(ExperimentError::UnknownVariant {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            })
            .unwrap_or_else(|| Err(ExperimentError::UnknownKey(key.to_string())))
    }
}
