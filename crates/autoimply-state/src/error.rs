//! Error types for autoimply-state

use thiserror::Error;

/// Errors raised by tag/history sources and submission sinks.
#[derive(Error, Debug)]
pub enum StateError {
    /// Snapshot file could not be read
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot or API payload could not be decoded
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// A glob handed to a tag source could not be turned into a matcher
    #[error("invalid name pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The remote endpoint could not be reached
    #[error("request failed: {0}")]
    Request(String),

    /// The remote endpoint answered with a non-success status
    #[error("submission rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Sink is missing required credentials
    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Deserialization(err.to_string())
    }
}

impl From<reqwest::Error> for StateError {
    fn from(err: reqwest::Error) -> Self {
        StateError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_error_displays_status_and_body() {
        let err = StateError::Rejected {
            status: 422,
            body: "script is invalid".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("422"));
        assert!(msg.contains("script is invalid"));
    }

    #[test]
    fn json_error_maps_to_deserialization() {
        let err: StateError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, StateError::Deserialization(_)));
    }
}
