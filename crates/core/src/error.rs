use thiserror::Error;

pub type ExperimentResult<T> = Result<T, ExperimentError>;

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown experiment: {0}")]
    UnknownKey(String),

    #[error("Unknown variant '{value}' for experiment '{key}'")]
    UnknownVariant { key: String, value: String },

    #[error("Duplicate experiment key: {0}")]
    DuplicateKey(String),

    #[error("Empty variant value in experiment '{0}'")]
    EmptyVariant(String),

    #[error("Duplicate variant '{value}' in experiment '{key}'")]
    DuplicateVariant { key: String, value: String },

    #[error("Conversion for '{value}' in experiment '{key}' exceeds recorded exposures")]
    ConversionExceedsExposure { key: String, value: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Value has no canonical form: {0}")]
    Stringification(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ExperimentError {
    fn from(err: config::ConfigError) -> Self {
        ExperimentError::Config(err.to_string())
    }
}
