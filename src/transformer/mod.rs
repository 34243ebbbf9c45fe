//! Transformer encoder layers with automatic differentiation support
//!
//! BERT-family encoders (BERT, TinyBERT, DistilBERT) built on the autograd
//! ops. Every layer can be created fresh or loaded from Hugging Face
//! SafeTensors weights, and exports its state back in the same layout.
//!
//! ## Components
//!
//! - `Embeddings`: word + position (+ token type) embeddings with LayerNorm
//! - `SelfAttention`: multi-head self-attention with a key padding mask
//! - `FeedForward`: position-wise MLP
//! - `EncoderLayer`: attention and FFN blocks with post-norm residuals
//! - `Encoder`: the full stack
//!
//! ## Example
//!
//! ```ignore
//! use impago::transformer::{Encoder, EncoderConfig, WeightMap};
//!
//! let config = EncoderConfig::from_file(&dir.join("config.json"))?;
//! let mut weights = WeightMap::load(&dir)?;
//! let encoder = Encoder::from_weights(&config, &mut weights)?;
//! let hidden = encoder.forward(&ids, &mask, batch, seq, &mut ctx)?;
//! ```

mod attention;
mod block;
mod config;
mod embedding;
mod feedforward;
mod linear;
mod model;
mod norm;
pub mod weights;

pub use attention::SelfAttention;
pub use block::EncoderLayer;
pub use config::{Activation, Architecture, EncoderConfig};
pub use embedding::{Embedding, Embeddings};
pub use feedforward::FeedForward;
pub use linear::{normal_init, Linear, INIT_STD};
pub use model::Encoder;
pub use norm::LayerNorm;
pub use weights::{StateEntry, WeightMap};
