use thiserror::Error;

/// Top-level error type for the Graphward platform.
#[derive(Error, Debug)]
pub enum GraphwardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<config::ConfigError> for GraphwardError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
