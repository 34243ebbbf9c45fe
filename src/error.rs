//! Error types for impago

use thiserror::Error;

/// Result type alias for impago operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for impago
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { name: String, expected: Vec<usize>, actual: Vec<usize> },

    #[error("Download failed: {0}")]
    Fetch(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] crate::tokenizer::TokenizerError),

    #[error("Metric error: {0}")]
    Metric(#[from] crate::eval::MetricError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = Error::ShapeMismatch {
            name: "classifier.weight".into(),
            expected: vec![2, 768],
            actual: vec![3, 768],
        };
        let msg = err.to_string();
        assert!(msg.contains("classifier.weight"));
        assert!(msg.contains("[2, 768]"));
    }
}
