use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid forecast horizon {months}: must be between 0 and {max}")]
    InvalidHorizon { months: i64, max: usize },

    #[error("Invalid configuration for {field}: {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Custom seasonality profile has invalid factors: {0}")]
    InvalidSeasonalityFactors(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalyticsError {
    pub(crate) fn config(field: &str, details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
