use std::path::Path;

use serde::Deserialize;

use crate::error::{ExperimentError, ExperimentResult};
use crate::types::{demo_definitions, ExperimentDefinition};

/// Engine configuration. Loaded from an optional config file and environment
/// variables with the prefix `DYNTEST__`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Probability of exploring a uniformly random variant.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Fixed RNG seed. `None` seeds from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_experiments")]
    pub experiments: Vec<ExperimentDefinition>,
}

fn default_epsilon() -> f64 {
    0.1
}
fn default_experiments() -> Vec<ExperimentDefinition> {
    demo_definitions()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            seed: None,
            experiments: default_experiments(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> ExperimentResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("DYNTEST")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ExperimentResult<()> {
        validate_epsilon(self.epsilon)
    }
}

/// Epsilon is a probability; NaN and values outside `[0, 1]` are rejected.
pub fn validate_epsilon(epsilon: f64) -> ExperimentResult<()> {
    if (0.0..=1.0).contains(&epsilon) {
        Ok(())
    } else {
        Err(ExperimentError::Config(format!(
            "epsilon must be within [0, 1], got {epsilon}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ANOTHER_TEST, PURCHASE_BUTTON_BACKGROUND_COLOR};

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.epsilon, 0.1);
        assert!(config.seed.is_none());
        let keys: Vec<_> = config.experiments.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec![PURCHASE_BUTTON_BACKGROUND_COLOR, ANOTHER_TEST]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_epsilon_bounds() {
        assert!(validate_epsilon(0.0).is_ok());
        assert!(validate_epsilon(1.0).is_ok());
        assert!(validate_epsilon(-0.01).is_err());
        assert!(validate_epsilon(1.5).is_err());
        assert!(validate_epsilon(f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_partial_document() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"epsilon": 0.25, "experiments": [{"key": "Headline", "variants": ["A", "B"]}]}"#,
        )
        .unwrap();
        assert_eq!(config.epsilon, 0.25);
        assert_eq!(config.experiments.len(), 1);
        assert_eq!(config.experiments[0].variants, vec!["A", "B"]);
    }
}
