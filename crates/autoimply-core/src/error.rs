//! Error taxonomy for autoimply.

use autoimply_state::StateError;

/// Errors raised while loading and validating series configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("series #{index} is missing required field: {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("series '{series}' has invalid costume pattern '{pattern}': {reason}")]
    InvalidPattern {
        series: String,
        pattern: String,
        reason: String,
    },

    #[error("series '{series}' must allow at least one batch per topic")]
    InvalidQuota { series: String },

    #[error("series '{0}' not found in config")]
    UnknownSeries(String),
}

/// Errors raised while parsing historical change-request scripts.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("expected exactly one ' -> ' separator in '{line}'")]
    SeparatorCount { line: String },

    #[error("implication sides must be single tags in '{line}'")]
    MultiWordSide { line: String },
}

impl LedgerError {
    /// The offending (normalized) script line.
    pub fn line(&self) -> &str {
        match self {
            LedgerError::SeparatorCount { line } | LedgerError::MultiWordSide { line } => line,
        }
    }
}

/// Top-level autoimply errors.
#[derive(Debug, thiserror::Error)]
pub enum AutoimplyError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("corrupt request history: {0}")]
    Ledger(#[from] LedgerError),

    /// A single-child group was left without exactly one cluster. This is a
    /// defect in the clustering pass, never bad input.
    #[error("clustering left groups unassigned: {leftovers:?}")]
    ClusteringInvariant { leftovers: Vec<String> },

    #[error("source error: {0}")]
    State(#[from] StateError),
}

/// Result type for autoimply operations.
pub type Result<T> = std::result::Result<T, AutoimplyError>;
