//! Tokenizer configuration types.

use serde::{Deserialize, Serialize};

/// Special tokens of a BERT vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Unknown token
    pub unk: String,
    /// Sequence start (classification token)
    pub cls: String,
    /// Sequence end
    pub sep: String,
    /// Padding token
    pub pad: String,
    /// Mask token (for MLM)
    pub mask: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            unk: "[UNK]".to_string(),
            cls: "[CLS]".to_string(),
            sep: "[SEP]".to_string(),
            pad: "[PAD]".to_string(),
            mask: "[MASK]".to_string(),
        }
    }
}

impl SpecialTokens {
    /// Whether `token` is one of the special tokens
    pub fn contains(&self, token: &str) -> bool {
        [&self.unk, &self.cls, &self.sep, &self.pad, &self.mask].iter().any(|t| *t == token)
    }
}

/// WordPiece tokenizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Lowercase and strip accents before splitting
    pub lowercase: bool,
    /// Words longer than this (in chars) become the unknown token
    pub max_input_chars_per_word: usize,
    /// Prefix of word-internal pieces
    pub continuation_prefix: String,
    /// Special tokens
    pub special_tokens: SpecialTokens,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            max_input_chars_per_word: 100,
            continuation_prefix: "##".to_string(),
            special_tokens: SpecialTokens::default(),
        }
    }
}

impl TokenizerConfig {
    /// Builder: set lowercasing
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }
}
