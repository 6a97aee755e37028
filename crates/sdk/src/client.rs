//! Host-facing experiments facade.

use std::sync::Arc;

use dyntest_bandit::{ExperimentEngine, InitOutcome};
use dyntest_core::{Color, EngineConfig, ExperimentDefinition, ExperimentResult, VariantValue};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy)]
enum Event {
    View,
    Conversion,
}

/// Typed reads and fire-and-forget event logging over an [`ExperimentEngine`].
///
/// Reads are served from a [`SessionSnapshot`] captured on the first read of
/// each session, so repeated reads never re-roll the bandit. Nothing here
/// returns an error for bad data: unknown keys, undecodable values and
/// unrecordable events fall back to the caller's default or do nothing.
pub struct ExperimentClient<R = StdRng> {
    engine: Arc<ExperimentEngine<R>>,
    session: Mutex<Option<Arc<SessionSnapshot>>>,
}

impl ExperimentClient<StdRng> {
    pub fn from_config(config: &EngineConfig) -> ExperimentResult<Self> {
        Ok(Self::new(Arc::new(ExperimentEngine::from_config(config)?)))
    }
}

impl<R: Rng> ExperimentClient<R> {
    pub fn new(engine: Arc<ExperimentEngine<R>>) -> Self {
        Self {
            engine,
            session: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &ExperimentEngine<R> {
        &self.engine
    }

    /// Build the catalog. Only the first successful call has an effect.
    pub fn initialize(&self, definitions: &[ExperimentDefinition]) -> ExperimentResult<InitOutcome> {
        self.engine.initialize(definitions)
    }

    /// Value for `key` decoded as the kind of `default`, or `default`.
    pub fn get(&self, key: &str, default: VariantValue) -> VariantValue {
        match self.snapshot() {
            Some(snapshot) => snapshot.get(key, default),
            None => default,
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key, default.into()).as_bool().unwrap_or(default)
    }

    pub fn get_color(&self, key: &str, default: Color) -> Color {
        self.get(key, default.into()).as_color().unwrap_or(default)
    }

    pub fn get_text(&self, key: &str, default: &str) -> String {
        match self.get(key, default.into()) {
            VariantValue::Text(text) => text,
            _ => default.to_string(),
        }
    }

    pub fn log_view(&self, key: &str, value: &VariantValue) {
        self.log(Event::View, key, value);
    }

    pub fn log_conversion(&self, key: &str, value: &VariantValue) {
        self.log(Event::Conversion, key, value);
    }

    /// Drop the current snapshot; the next read starts a new session.
    pub fn new_session(&self) {
        if let Some(old) = self.session.lock().take() {
            debug!(session_id = %old.id, "session ended");
        }
    }

    /// The current session, if a read has started one.
    pub fn session(&self) -> Option<Arc<SessionSnapshot>> {
        self.session.lock().clone()
    }

    pub fn report(&self) -> String {
        self.engine.report()
    }

    pub fn report_json(&self) -> ExperimentResult<String> {
        self.engine.report_json()
    }

    fn snapshot(&self) -> Option<Arc<SessionSnapshot>> {
        // An uninitialized engine has nothing to memoize.
        if !self.engine.is_initialized() {
            return None;
        }
        let mut session = self.session.lock();
        let snapshot =
            session.get_or_insert_with(|| Arc::new(SessionSnapshot::capture(&*self.engine)));
        Some(Arc::clone(snapshot))
    }

    fn log(&self, event: Event, key: &str, value: &VariantValue) {
        let result = value.to_canonical().and_then(|canonical| match event {
            Event::View => self.engine.record_exposure(key, &canonical),
            Event::Conversion => self.engine.record_conversion(key, &canonical),
        });
        if let Err(e) = result {
            debug!(key, ?event, error = %e, "experiment event dropped");
        }
    }
}
