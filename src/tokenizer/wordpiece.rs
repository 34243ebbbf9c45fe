//! WordPiece tokenizer for BERT-family vocabularies

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::basic::basic_tokenize;
use super::config::TokenizerConfig;
use super::error::{Result, TokenizerError};
use super::traits::{TokenId, Tokenizer};

/// Model inputs for one text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoding {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl Encoding {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Greedy longest-match-first WordPiece tokenizer
#[derive(Debug, Clone)]
pub struct WordPieceTokenizer {
    config: TokenizerConfig,
    vocab: HashMap<String, TokenId>,
    id_to_token: Vec<String>,
    unk_id: TokenId,
    cls_id: TokenId,
    sep_id: TokenId,
    pad_id: TokenId,
}

impl WordPieceTokenizer {
    /// Build from tokens in ID order
    pub fn from_tokens(tokens: Vec<String>, config: TokenizerConfig) -> Result<Self> {
        if tokens.is_empty() {
            return Err(TokenizerError::EmptyVocab);
        }
        let vocab = tokens.iter().enumerate().map(|(i, t)| (t.clone(), i as TokenId)).collect();
        Self::with_vocab(vocab, tokens, config)
    }

    fn with_vocab(
        vocab: HashMap<String, TokenId>,
        id_to_token: Vec<String>,
        config: TokenizerConfig,
    ) -> Result<Self> {
        let special = &config.special_tokens;
        let lookup = |token: &str| {
            vocab
                .get(token)
                .copied()
                .ok_or_else(|| TokenizerError::MissingSpecialToken(token.to_string()))
        };
        let unk_id = lookup(&special.unk)?;
        let cls_id = lookup(&special.cls)?;
        let sep_id = lookup(&special.sep)?;
        let pad_id = lookup(&special.pad)?;
        Ok(Self { config, vocab, id_to_token, unk_id, cls_id, sep_id, pad_id })
    }

    /// Load a `vocab.txt` (one token per line, line number = ID)
    pub fn from_vocab_file(path: &Path, config: TokenizerConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let tokens = text.lines().map(|l| l.trim().to_string()).collect();
        Self::from_tokens(tokens, config)
    }

    /// Load the WordPiece vocabulary of a Hugging Face `tokenizer.json`
    ///
    /// The lowercasing flag of a `BertNormalizer` overrides `config.lowercase`.
    pub fn from_tokenizer_json(path: &Path, mut config: TokenizerConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let root: Value = serde_json::from_str(&text).map_err(|e| {
            TokenizerError::Serialization(format!("Failed to parse {}: {e}", path.display()))
        })?;

        let model = &root["model"];
        if let Some(kind) = model.get("type").and_then(Value::as_str) {
            if kind != "WordPiece" {
                return Err(TokenizerError::Serialization(format!(
                    "{} holds a {kind} tokenizer, expected WordPiece",
                    path.display()
                )));
            }
        }
        let map = model.get("vocab").and_then(Value::as_object).ok_or_else(|| {
            TokenizerError::Serialization(format!("{} has no model.vocab", path.display()))
        })?;
        if map.is_empty() {
            return Err(TokenizerError::EmptyVocab);
        }

        let mut vocab = HashMap::with_capacity(map.len());
        for (token, id) in map {
            let id = id.as_u64().ok_or_else(|| {
                TokenizerError::Serialization(format!("Token {token:?} has a non-integer id"))
            })?;
            vocab.insert(token.clone(), id as TokenId);
        }
        let size = vocab.values().max().map_or(0, |&m| m as usize + 1);
        let mut id_to_token: Vec<String> = (0..size).map(|i| format!("[unused{i}]")).collect();
        for (token, &id) in &vocab {
            id_to_token[id as usize] = token.clone();
        }

        if let Some(lowercase) = root["normalizer"].get("lowercase").and_then(Value::as_bool) {
            config.lowercase = lowercase;
        }
        if let Some(prefix) = model.get("continuing_subword_prefix").and_then(Value::as_str) {
            config.continuation_prefix = prefix.to_string();
        }
        if let Some(max) = model.get("max_input_chars_per_word").and_then(Value::as_u64) {
            config.max_input_chars_per_word = max as usize;
        }
        Self::with_vocab(vocab, id_to_token, config)
    }

    /// Write `vocab.txt` in ID order
    pub fn save_vocab(&self, path: &Path) -> Result<()> {
        let mut text = self.id_to_token.join("\n");
        text.push('\n');
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Whether the vocabulary has any token with an uppercase letter
    pub fn has_uppercase_tokens(&self) -> bool {
        self.id_to_token
            .iter()
            .filter(|t| !self.config.special_tokens.contains(t) && !t.starts_with("[unused"))
            .any(|t| t.chars().any(char::is_uppercase))
    }

    /// Switch lowercasing after loading
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.config.lowercase = lowercase;
        self
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn pad_id(&self) -> TokenId {
        self.pad_id
    }

    pub fn cls_id(&self) -> TokenId {
        self.cls_id
    }

    pub fn sep_id(&self) -> TokenId {
        self.sep_id
    }

    pub fn unk_id(&self) -> TokenId {
        self.unk_id
    }

    /// `[CLS] tokens [SEP]`, truncated to at most `max_length` IDs
    pub fn encode_for_model(&self, text: &str, max_length: usize) -> Result<Encoding> {
        if max_length < 2 {
            return Err(TokenizerError::MaxLengthTooSmall(max_length));
        }
        let mut body = self.encode(text)?;
        body.truncate(max_length - 2);

        let mut input_ids = Vec::with_capacity(body.len() + 2);
        input_ids.push(self.cls_id);
        input_ids.extend(body);
        input_ids.push(self.sep_id);
        let attention_mask = vec![1; input_ids.len()];
        Ok(Encoding { input_ids, attention_mask })
    }

    fn wordpiece(&self, word: &str, out: &mut Vec<TokenId>) {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > self.config.max_input_chars_per_word {
            out.push(self.unk_id);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while start < end {
                let mut candidate: String = chars[start..end].iter().collect();
                if start > 0 {
                    candidate.insert_str(0, &self.config.continuation_prefix);
                }
                if let Some(&id) = self.vocab.get(&candidate) {
                    found = Some(id);
                    break;
                }
                end -= 1;
            }
            match found {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    out.push(self.unk_id);
                    return;
                }
            }
        }
        out.extend(pieces);
    }
}

impl Tokenizer for WordPieceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let mut ids = Vec::new();
        for word in basic_tokenize(text, self.config.lowercase) {
            self.wordpiece(&word, &mut ids);
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String> {
        let prefix = &self.config.continuation_prefix;
        let mut text = String::new();
        for &id in ids {
            let token = self.id_to_token(id).ok_or(TokenizerError::InvalidTokenId(id))?;
            if self.config.special_tokens.contains(token) && id != self.unk_id {
                continue;
            }
            match token.strip_prefix(prefix.as_str()) {
                Some(rest) if !text.is_empty() => text.push_str(rest),
                _ => {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(token);
                }
            }
        }
        Ok(text)
    }

    fn vocab_size(&self) -> usize {
        self.id_to_token.len()
    }

    fn id_to_token(&self, id: TokenId) -> Option<&str> {
        self.id_to_token.get(id as usize).map(String::as_str)
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.vocab.get(token).copied()
    }
}
