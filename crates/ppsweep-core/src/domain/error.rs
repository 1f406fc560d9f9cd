//! Error taxonomy for sweep planning and report parsing.

/// Errors produced while planning a sweep or reading its artifacts.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("unknown filter code: {0}")]
    UnknownCode(String),

    #[error("filter {filter} has no parameter named {parameter} to discriminate over")]
    MissingDiscriminant { filter: String, parameter: String },

    #[error("no {metric} found in {source_name}")]
    MissingMetric { metric: String, source_name: String },

    #[error("engine summary is missing its {part} line")]
    MissingSummary { part: String },

    #[error("report {file} has parameters [{actual}], expected [{expected}]")]
    SchemaMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("malformed filename {file}: {reason}")]
    MalformedFilename { file: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SweepError::Configuration(msg.into())
    }

    pub(crate) fn malformed(file: &str, reason: impl Into<String>) -> Self {
        SweepError::MalformedFilename {
            file: file.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;
