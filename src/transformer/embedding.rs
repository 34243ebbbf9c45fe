//! Embedding block: word + position (+ token type), then LayerNorm and dropout

use super::config::EncoderConfig;
use super::linear::{normal_init, INIT_STD};
use super::norm::LayerNorm;
use super::weights::{embedding_names, EmbeddingNames, StateEntry, WeightMap};
use crate::autograd::{add, dropout, gather_rows, Context};
use crate::error::{Error, Result};
use crate::Tensor;
use rand::rngs::StdRng;

/// Lookup table of `rows x dim` vectors
pub struct Embedding {
    name: String,
    /// `rows x dim`, row-major
    pub weight: Tensor,
    rows: usize,
    dim: usize,
}

impl Embedding {
    /// Randomly initialized table
    pub fn new(name: &str, rows: usize, dim: usize, rng: &mut StdRng) -> Self {
        Self {
            name: name.to_string(),
            weight: Tensor::from_vec(normal_init(rows * dim, INIT_STD, rng), true),
            rows,
            dim,
        }
    }

    /// Load `{name}.weight`
    pub fn require(weights: &mut WeightMap, name: &str, rows: usize, dim: usize) -> Result<Self> {
        let weight = weights.require(&format!("{name}.weight"), &[rows, dim])?;
        Ok(Self { name: name.to_string(), weight: Tensor::from_vec(weight, true), rows, dim })
    }

    /// Look up `indices`, failing on an index past the table
    pub fn forward(&self, indices: &[usize]) -> Result<Tensor> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.rows) {
            return Err(Error::InvalidFormat(format!(
                "{}: index {bad} out of range for {} rows",
                self.name, self.rows
            )));
        }
        Ok(gather_rows(&self.weight, indices, self.dim))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn state_dict(&self) -> StateEntry {
        StateEntry {
            name: format!("{}.weight", self.name),
            shape: vec![self.rows, self.dim],
            data: self.weight.to_vec(),
        }
    }
}

/// Input embeddings of the encoder
pub struct Embeddings {
    pub word: Embedding,
    pub position: Embedding,
    /// BERT only; every input uses segment 0
    pub token_type: Option<Embedding>,
    pub norm: LayerNorm,
    dropout: f32,
    hidden: usize,
}

impl Embeddings {
    /// Fresh embeddings for `config`
    pub fn new(config: &EncoderConfig, rng: &mut StdRng) -> Self {
        let names = embedding_names(config.architecture);
        let h = config.hidden_size;
        Self {
            word: Embedding::new(&names.word, config.vocab_size, h, rng),
            position: Embedding::new(&names.position, config.max_position_embeddings, h, rng),
            token_type: names
                .token_type
                .as_deref()
                .filter(|_| config.type_vocab_size > 0)
                .map(|n| Embedding::new(n, config.type_vocab_size, h, rng)),
            norm: LayerNorm::new(&names.norm, h, config.layer_norm_eps),
            dropout: config.hidden_dropout,
            hidden: h,
        }
    }

    /// Load from pretrained weights
    pub fn from_weights(config: &EncoderConfig, weights: &mut WeightMap) -> Result<Self> {
        let EmbeddingNames { word, position, token_type, norm } =
            embedding_names(config.architecture);
        let h = config.hidden_size;
        let token_type = match token_type {
            Some(name) if config.type_vocab_size > 0 => {
                Some(Embedding::require(weights, &name, config.type_vocab_size, h)?)
            }
            _ => None,
        };
        Ok(Self {
            word: Embedding::require(weights, &word, config.vocab_size, h)?,
            position: Embedding::require(weights, &position, config.max_position_embeddings, h)?,
            token_type,
            norm: LayerNorm::require(weights, &norm, h, config.layer_norm_eps)?,
            dropout: config.hidden_dropout,
            hidden: h,
        })
    }

    /// Embed `batch` sequences of `seq` token ids
    pub fn forward(
        &self,
        input_ids: &[u32],
        batch: usize,
        seq: usize,
        ctx: &mut Context,
    ) -> Result<Tensor> {
        if seq > self.position.rows() {
            return Err(Error::InvalidFormat(format!(
                "sequence length {seq} exceeds max_position_embeddings {}",
                self.position.rows()
            )));
        }
        let ids: Vec<usize> = input_ids.iter().map(|&t| t as usize).collect();
        let positions: Vec<usize> = (0..batch).flat_map(|_| 0..seq).collect();

        let mut x = add(&self.word.forward(&ids)?, &self.position.forward(&positions)?);
        if let Some(token_type) = &self.token_type {
            x = add(&x, &token_type.forward(&vec![0; batch * seq])?);
        }
        let x = self.norm.forward(&x, batch * seq);
        Ok(dropout(&x, self.dropout, ctx))
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.word.weight, &self.position.weight];
        if let Some(t) = &self.token_type {
            params.push(&t.weight);
        }
        params.extend(self.norm.parameters());
        params
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = vec![&mut self.word.weight, &mut self.position.weight];
        if let Some(t) = &mut self.token_type {
            params.push(&mut t.weight);
        }
        params.extend(self.norm.parameters_mut());
        params
    }

    pub fn state_dict(&self) -> Vec<StateEntry> {
        let mut entries = vec![self.word.state_dict(), self.position.state_dict()];
        if let Some(t) = &self.token_type {
            entries.push(t.state_dict());
        }
        entries.extend(self.norm.state_dict());
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_embeddings_output_shape() {
        let config = EncoderConfig::tiny(30);
        let mut rng = StdRng::seed_from_u64(1);
        let emb = Embeddings::new(&config, &mut rng);
        let mut ctx = Context::with_seed(1);
        ctx.eval();
        let out = emb.forward(&[2, 5, 7, 0, 3, 4], 2, 3, &mut ctx).unwrap();
        assert_eq!(out.len(), 6 * 16);
    }

    #[test]
    fn test_bert_has_token_type_table() {
        let mut rng = StdRng::seed_from_u64(1);
        let emb = Embeddings::new(&EncoderConfig::tiny_bert(30), &mut rng);
        assert!(emb.token_type.is_some());
        assert_eq!(emb.parameters().len(), 5);
        assert_eq!(emb.state_dict()[2].name, "embeddings.token_type_embeddings.weight");

        let emb = Embeddings::new(&EncoderConfig::tiny(30), &mut rng);
        assert!(emb.token_type.is_none());
        assert_eq!(emb.parameters().len(), 4);
    }

    #[test]
    fn test_out_of_vocab_id_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let emb = Embeddings::new(&EncoderConfig::tiny(30), &mut rng);
        let mut ctx = Context::with_seed(1);
        assert!(emb.forward(&[31], 1, 1, &mut ctx).is_err());
    }

    #[test]
    fn test_too_long_sequence_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let emb = Embeddings::new(&EncoderConfig::tiny(30), &mut rng);
        let mut ctx = Context::with_seed(1);
        let ids = vec![1u32; 65];
        assert!(emb.forward(&ids, 1, 65, &mut ctx).is_err());
    }
}
