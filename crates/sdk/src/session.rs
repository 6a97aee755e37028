//! Session snapshots: one bandit pass per key, memoized for the session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dyntest_bandit::ExperimentEngine;
use dyntest_core::VariantValue;
use rand::Rng;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// The variant chosen for every registered key at session start.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    choices: HashMap<String, String>,
}

impl SessionSnapshot {
    /// Ask the selector once per key, in catalog order. Keys without any
    /// variant are left out.
    pub fn capture<R: Rng>(engine: &ExperimentEngine<R>) -> Self {
        let choices: HashMap<String, String> = engine
            .keys()
            .into_iter()
            .filter_map(|key| engine.choose(&key).map(|s| (key, s.value)))
            .collect();

        let snapshot = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            choices,
        };
        debug!(session_id = %snapshot.id, keys = snapshot.choices.len(), "session snapshot captured");
        snapshot
    }

    /// Canonical string chosen for `key`.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.choices.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Decode the chosen value as the kind of `default`. Unknown keys and
    /// undecodable values yield `default`.
    pub fn get(&self, key: &str, default: VariantValue) -> VariantValue {
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match VariantValue::parse_as(default.kind(), raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, raw, error = %e, "variant not decodable, using default");
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntest_bandit::BanditSelector;
    use dyntest_core::{Color, ExperimentDefinition};
    use rand::rngs::mock::StepRng;

    fn engine(definitions: &[ExperimentDefinition]) -> ExperimentEngine<StepRng> {
        let selector = BanditSelector::with_rng(0.1, StepRng::new(u64::MAX, 0)).unwrap();
        let engine = ExperimentEngine::new(selector);
        engine.initialize(definitions).unwrap();
        engine
    }

    #[test]
    fn test_capture_covers_every_populated_key() {
        let engine = engine(&[
            ExperimentDefinition::flag("Flag"),
            ExperimentDefinition::new("Empty", vec![]),
            ExperimentDefinition::colors("Color", &[Color::RED]),
        ]);
        let snapshot = SessionSnapshot::capture(&engine);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.raw("Flag"), Some("true"));
        assert_eq!(snapshot.raw("Color"), Some("#FFFF0000"));
        assert_eq!(snapshot.raw("Empty"), None);
    }

    #[test]
    fn test_get_decodes_by_default_kind() {
        let engine = engine(&[
            ExperimentDefinition::flag("Flag"),
            ExperimentDefinition::colors("Color", &[Color::BLUE]),
            ExperimentDefinition::texts("Headline", &["Buy now"]),
        ]);
        let snapshot = SessionSnapshot::capture(&engine);

        assert_eq!(snapshot.get("Flag", false.into()), VariantValue::Bool(true));
        assert_eq!(snapshot.get("Color", Color::GRAY.into()), VariantValue::Color(Color::BLUE));
        assert_eq!(snapshot.get("Headline", "fallback".into()), VariantValue::from("Buy now"));
        // Any stored value is valid text.
        assert_eq!(snapshot.get("Flag", "fallback".into()), VariantValue::from("true"));
    }

    #[test]
    fn test_get_fails_closed_on_mismatch() {
        let engine = engine(&[
            ExperimentDefinition::texts("Color", &["#FF00FF"]),
            ExperimentDefinition::colors("Paint", &[Color::RED]),
        ]);
        let snapshot = SessionSnapshot::capture(&engine);

        // Six hex digits is not a valid ARGB color.
        assert_eq!(snapshot.get("Color", Color::GRAY.into()), VariantValue::Color(Color::GRAY));
        assert_eq!(snapshot.get("Paint", true.into()), VariantValue::Bool(true));
        assert_eq!(snapshot.get("Missing", false.into()), VariantValue::Bool(false));
    }
}
