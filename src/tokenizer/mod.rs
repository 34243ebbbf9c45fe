//! Subword tokenization for BERT-family encoders
//!
//! WordPiece over a pretrained vocabulary, loaded from `vocab.txt` or from a
//! Hugging Face `tokenizer.json`. Text is cleaned, split on whitespace and
//! punctuation (optionally lowercased with accents stripped), and each word
//! is segmented greedily into the longest vocabulary pieces.
//!
//! # Example
//!
//! ```
//! use impago::tokenizer::{Tokenizer, TokenizerConfig, WordPieceTokenizer};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let vocab = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "loan", "##s"];
//!     let tokens = vocab.iter().map(|s| s.to_string()).collect();
//!     let tokenizer = WordPieceTokenizer::from_tokens(tokens, TokenizerConfig::default())?;
//!
//!     let encoding = tokenizer.encode_for_model("Loans", 16)?;
//!     assert_eq!(encoding.input_ids, vec![2, 4, 5, 3]);
//!     assert_eq!(tokenizer.decode(&encoding.input_ids)?, "loans");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

mod basic;
mod config;
mod error;
mod traits;
mod wordpiece;

pub use basic::basic_tokenize;
pub use config::{SpecialTokens, TokenizerConfig};
pub use error::{Result, TokenizerError};
pub use traits::{TokenId, Tokenizer};
pub use wordpiece::{Encoding, WordPieceTokenizer};
