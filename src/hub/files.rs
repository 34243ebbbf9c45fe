//! Files of a pretrained model directory

use crate::error::{Error, Result};
use crate::tokenizer::{TokenizerConfig, WordPieceTokenizer};
use crate::transformer::EncoderConfig;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Locations of the pieces of a pretrained model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    /// Directory holding everything below
    pub root: PathBuf,
    /// `config.json`
    pub config: PathBuf,
    /// Directory or single file with SafeTensors weights
    pub weights: PathBuf,
    pub vocab: Option<PathBuf>,
    pub tokenizer_json: Option<PathBuf>,
    pub tokenizer_config: Option<PathBuf>,
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

impl ModelFiles {
    /// Describe a local model directory
    ///
    /// Requires `config.json` and a tokenizer vocabulary (`vocab.txt` or
    /// `tokenizer.json`). Weights are looked up when the model is built.
    pub fn from_dir(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::ConfigError(format!("{} is not a directory", root.display())));
        }
        let config = root.join("config.json");
        if !config.is_file() {
            return Err(Error::ConfigError(format!("{} has no config.json", root.display())));
        }
        let files = Self {
            root: root.to_path_buf(),
            config,
            weights: root.to_path_buf(),
            vocab: existing(root.join("vocab.txt")),
            tokenizer_json: existing(root.join("tokenizer.json")),
            tokenizer_config: existing(root.join("tokenizer_config.json")),
        };
        if files.vocab.is_none() && files.tokenizer_json.is_none() {
            return Err(Error::ConfigError(format!(
                "{} has neither vocab.txt nor tokenizer.json",
                root.display()
            )));
        }
        Ok(files)
    }

    /// Parse `config.json`
    pub fn encoder_config(&self) -> Result<EncoderConfig> {
        EncoderConfig::from_file(&self.config)
    }

    /// `do_lower_case` from `tokenizer_config.json`, if it says
    fn configured_lowercase(&self) -> Result<Option<bool>> {
        let Some(path) = &self.tokenizer_config else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {e}", path.display())))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(value.get("do_lower_case").and_then(Value::as_bool))
    }

    /// Load the WordPiece tokenizer
    ///
    /// Lowercasing follows `tokenizer_config.json` when it sets
    /// `do_lower_case`. Otherwise a model whose name says "uncased", or
    /// whose vocabulary has no uppercase tokens, is lowercased.
    pub fn load_tokenizer(&self, model_name: &str) -> Result<WordPieceTokenizer> {
        let configured = self.configured_lowercase()?;
        let config = TokenizerConfig::default().with_lowercase(configured.unwrap_or(true));

        let tokenizer = match (&self.vocab, &self.tokenizer_json) {
            (Some(vocab), _) => WordPieceTokenizer::from_vocab_file(vocab, config)?,
            // tokenizer.json carries its own normalizer settings
            (None, Some(json)) => return Ok(WordPieceTokenizer::from_tokenizer_json(json, config)?),
            (None, None) => {
                return Err(Error::ConfigError(format!(
                    "{} has no tokenizer vocabulary",
                    self.root.display()
                )))
            }
        };

        if configured.is_some() {
            return Ok(tokenizer);
        }
        let lowercase =
            model_name.to_lowercase().contains("uncased") || !tokenizer.has_uppercase_tokens();
        Ok(tokenizer.with_lowercase(lowercase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;
    use tempfile::TempDir;

    fn write_model_dir(vocab: &[&str], tokenizer_config: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        let config = EncoderConfig::tiny(vocab.len());
        std::fs::write(
            dir.path().join("config.json"),
            config.to_classifier_json(&["Not Defaulted", "Defaulted"]).to_string(),
        )
        .unwrap();
        std::fs::write(dir.path().join("vocab.txt"), vocab.join("\n")).unwrap();
        if let Some(tc) = tokenizer_config {
            std::fs::write(dir.path().join("tokenizer_config.json"), tc).unwrap();
        }
        dir
    }

    const LOWER: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "loan"];
    const CASED: [&str; 6] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "loan", "Loan"];

    #[test]
    fn test_from_dir_finds_files() {
        let dir = write_model_dir(&LOWER, None);
        let files = ModelFiles::from_dir(dir.path()).unwrap();
        assert_eq!(files.vocab, Some(dir.path().join("vocab.txt")));
        assert!(files.tokenizer_json.is_none());
        assert_eq!(files.encoder_config().unwrap().hidden_size, 16);
    }

    #[test]
    fn test_from_dir_requires_config_and_vocab() {
        let dir = TempDir::new().unwrap();
        assert!(ModelFiles::from_dir(dir.path()).is_err());
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        let err = ModelFiles::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("vocab.txt"));
    }

    #[test]
    fn test_lowercase_vocab_lowercases() {
        let dir = write_model_dir(&LOWER, None);
        let tok = ModelFiles::from_dir(dir.path()).unwrap().load_tokenizer("some/model").unwrap();
        assert!(tok.config().lowercase);
        assert_eq!(tok.encode("LOAN").unwrap(), vec![4]);
    }

    #[test]
    fn test_cased_vocab_keeps_case() {
        let dir = write_model_dir(&CASED, None);
        let tok = ModelFiles::from_dir(dir.path()).unwrap().load_tokenizer("some/model").unwrap();
        assert!(!tok.config().lowercase);
        assert_eq!(tok.encode("Loan").unwrap(), vec![5]);

        let tok = ModelFiles::from_dir(dir.path())
            .unwrap()
            .load_tokenizer("org/bert-base-uncased")
            .unwrap();
        assert!(tok.config().lowercase);
    }

    #[test]
    fn test_tokenizer_config_wins() {
        let dir = write_model_dir(&LOWER, Some(r#"{"do_lower_case": false}"#));
        let tok = ModelFiles::from_dir(dir.path()).unwrap().load_tokenizer("x-uncased").unwrap();
        assert!(!tok.config().lowercase);
    }
}
