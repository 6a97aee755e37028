//! Variant records and the experiment catalog.

use std::collections::HashSet;

use dashmap::DashMap;
use dyntest_core::types::canonical_variant;
use dyntest_core::{ExperimentDefinition, ExperimentError, ExperimentResult};
use serde::Serialize;

/// One candidate value of an experiment with its exposure/conversion counters.
///
/// Counters are only reachable through [`record_exposure`](Self::record_exposure)
/// and [`record_conversion`](Self::record_conversion), which keep
/// `displayed >= selected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    value: String,
    displayed: u64,
    selected: u64,
}

impl VariantRecord {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            displayed: 0,
            selected: 0,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn displayed(&self) -> u64 {
        self.displayed
    }

    pub fn selected(&self) -> u64 {
        self.selected
    }

    /// Empirical conversion rate, `0` before the first exposure.
    pub fn chance_of_working(&self) -> f64 {
        if self.displayed == 0 {
            0.0
        } else {
            self.selected as f64 / self.displayed as f64
        }
    }

    pub fn record_exposure(&mut self) {
        self.displayed += 1;
    }

    /// Returns `false` (and leaves the counters alone) when the conversion
    /// has no exposure left to attribute to.
    pub fn record_conversion(&mut self) -> bool {
        if self.selected >= self.displayed {
            return false;
        }
        self.selected += 1;
        debug_assert!(self.displayed >= self.selected);
        true
    }

    pub fn stats(&self) -> VariantStats {
        VariantStats {
            value: self.value.clone(),
            displayed: self.displayed,
            selected: self.selected,
            chance_of_working: self.chance_of_working(),
        }
    }
}

/// Point-in-time copy of a variant's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantStats {
    pub value: String,
    pub displayed: u64,
    pub selected: u64,
    pub chance_of_working: f64,
}

/// A named feature under test. Variant order is fixed at construction.
#[derive(Debug, Clone)]
pub struct Experiment {
    key: String,
    variants: Vec<VariantRecord>,
}

impl Experiment {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn variants(&self) -> &[VariantRecord] {
        &self.variants
    }

    pub fn variant_mut(&mut self, value: &str) -> Option<&mut VariantRecord> {
        self.variants.iter_mut().find(|v| v.value == value)
    }
}

/// Experiment key → experiment, plus the key insertion order.
///
/// The key set and each experiment's variant list are frozen once built; only
/// the counters inside the records change. Each experiment sits in its own
/// `DashMap` entry, so counter updates and selection reads for a key are
/// serialized by that entry's shard lock.
#[derive(Debug, Default)]
pub struct Catalog {
    order: Vec<String>,
    experiments: DashMap<String, Experiment>,
}

impl Catalog {
    /// Build a catalog with zeroed counters. Values are stored in canonical
    /// form so they match what logging produces. Duplicate keys, empty values,
    /// and values that collide after canonicalization are rejected.
    pub fn build(definitions: &[ExperimentDefinition]) -> ExperimentResult<Self> {
        let experiments = DashMap::with_capacity(definitions.len());
        let mut order = Vec::with_capacity(definitions.len());

        for def in definitions {
            if experiments.contains_key(&def.key) {
                return Err(ExperimentError::DuplicateKey(def.key.clone()));
            }
            let mut seen = HashSet::with_capacity(def.variants.len());
            let mut variants = Vec::with_capacity(def.variants.len());
            for raw in &def.variants {
                let value = canonical_variant(raw)
                    .map_err(|_| ExperimentError::EmptyVariant(def.key.clone()))?;
                if !seen.insert(value.clone()) {
                    return Err(ExperimentError::DuplicateVariant {
                        key: def.key.clone(),
                        value,
                    });
                }
                variants.push(VariantRecord::new(value));
            }

            let experiment = Experiment {
                key: def.key.clone(),
                variants,
            };
            order.push(def.key.clone());
            experiments.insert(def.key.clone(), experiment);
        }

        Ok(Self { order, experiments })
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.experiments.contains_key(key)
    }

    /// Run `f` against the experiment while holding its read lock.
    pub fn with_experiment<T>(&self, key: &str, f: impl FnOnce(&Experiment) -> T) -> Option<T> {
        self.experiments.get(key).map(|entry| f(entry.value()))
    }

    /// Run `f` against the experiment while holding its write lock.
    pub fn with_experiment_mut<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut Experiment) -> T,
    ) -> Option<T> {
        self.experiments
            .get_mut(key)
            .map(|mut entry| f(entry.value_mut()))
    }
}
