//! Tokenizer error types.

use thiserror::Error;

/// Tokenizer errors
#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("Vocabulary is empty")]
    EmptyVocab,

    #[error("Vocabulary has no special token {0}")]
    MissingSpecialToken(String),

    #[error("Invalid token ID: {0}")]
    InvalidTokenId(u32),

    #[error("max_length must be at least 2, got {0}")]
    MaxLengthTooSmall(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for tokenizer operations
pub type Result<T> = std::result::Result<T, TokenizerError>;
