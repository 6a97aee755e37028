//! The experiment context: owns the catalog, tracker and selector.

use dyntest_core::{EngineConfig, ExperimentDefinition, ExperimentError, ExperimentResult};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use crate::catalog::{Catalog, VariantStats};
use crate::report::ReportGenerator;
use crate::selector::{BanditSelector, Selection};
use crate::tracker::Tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The catalog was built by this call.
    Initialized,
    /// A catalog already existed; the call changed nothing.
    AlreadyInitialized,
}

/// Explicit experiment context.
///
/// Lifecycle is initialize-once: the first successful [`initialize`](Self::initialize)
/// builds the catalog and every later call is a no-op that keeps accumulated
/// statistics. Before initialization every key is unknown.
pub struct ExperimentEngine<R = StdRng> {
    selector: BanditSelector<R>,
    tracker: RwLock<Option<Tracker>>,
}

impl ExperimentEngine<StdRng> {
    /// Engine configured from `config` (epsilon and optional seed). The
    /// catalog is not built until [`initialize`](Self::initialize).
    pub fn from_config(config: &EngineConfig) -> ExperimentResult<Self> {
        let selector = match config.seed {
            Some(seed) => BanditSelector::with_seed(config.epsilon, seed)?,
            None => BanditSelector::new(config.epsilon)?,
        };
        Ok(Self::new(selector))
    }
}

impl<R: Rng> ExperimentEngine<R> {
    pub fn new(selector: BanditSelector<R>) -> Self {
        Self {
            selector,
            tracker: RwLock::new(None),
        }
    }

    pub fn initialize(&self, definitions: &[ExperimentDefinition]) -> ExperimentResult<InitOutcome> {
        let mut tracker = self.tracker.write();
        if tracker.is_some() {
            debug!("experiment catalog already initialized, ignoring");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let catalog = Catalog::build(definitions)?;
        info!(
            experiments = catalog.len(),
            epsilon = self.selector.epsilon(),
            "experiment catalog initialized"
        );
        *tracker = Some(Tracker::new(catalog.into()));
        Ok(InitOutcome::Initialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.tracker.read().is_some()
    }

    /// Registered keys in catalog order; empty before initialization.
    pub fn keys(&self) -> Vec<String> {
        self.tracker
            .read()
            .as_ref()
            .map(|t| t.catalog().keys().to_vec())
            .unwrap_or_default()
    }

    pub fn choose(&self, key: &str) -> Option<Selection> {
        let tracker = self.tracker.read();
        self.selector.choose(tracker.as_ref()?.catalog(), key)
    }

    pub fn record_exposure(&self, key: &str, value: &str) -> ExperimentResult<()> {
        self.with_tracker(key, |t| t.record_exposure(key, value))
    }

    pub fn record_conversion(&self, key: &str, value: &str) -> ExperimentResult<()> {
        self.with_tracker(key, |t| t.record_conversion(key, value))
    }

    pub fn stats(&self, key: &str) -> ExperimentResult<Vec<VariantStats>> {
        self.with_tracker(key, |t| t.stats(key))
    }

    /// Text report; empty before initialization.
    pub fn report(&self) -> String {
        self.tracker
            .read()
            .as_ref()
            .map(|t| ReportGenerator::text(t.catalog()))
            .unwrap_or_default()
    }

    pub fn report_json(&self) -> ExperimentResult<String> {
        match self.tracker.read().as_ref() {
            Some(t) => ReportGenerator::json(t.catalog()),
            None => ReportGenerator::json(&Catalog::default()),
        }
    }

    fn with_tracker<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Tracker) -> ExperimentResult<T>,
    ) -> ExperimentResult<T> {
        match self.tracker.read().as_ref() {
            Some(tracker) => f(tracker),
            None => Err(ExperimentError::UnknownKey(key.to_string())),
        }
    }
}
