//! Encoder with a sequence classification head
//!
//! The head follows the Hugging Face `*ForSequenceClassification` models so
//! fine-tuned checkpoints load in either direction:
//!
//! - DistilBERT: `[CLS]` -> `pre_classifier` -> ReLU -> dropout -> `classifier`
//! - BERT: `[CLS]` -> `pooler.dense` -> tanh -> dropout -> `classifier`

use crate::autograd::{cross_entropy, dropout, gather_rows, relu, tanh, Context};
use crate::error::{Error, Result};
use crate::hub::ModelFiles;
use crate::tokenizer::WordPieceTokenizer;
use crate::transformer::weights::save_safetensors;
use crate::transformer::{Architecture, Encoder, EncoderConfig, Linear, StateEntry, WeightMap};
use crate::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::Path;

/// Result of a classifier forward pass
pub struct ClassifierOutput {
    /// Mean cross-entropy, present when labels were given
    pub loss: Option<Tensor>,
    /// One row of `num_labels` logits per input
    pub logits: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadActivation {
    Relu,
    Tanh,
}

/// Dense + activation + dropout + output projection over the `[CLS]` vector
pub struct ClassificationHead {
    dense: Linear,
    activation: HeadActivation,
    dropout: f32,
    classifier: Linear,
}

fn head_layout(arch: Architecture) -> (&'static str, HeadActivation) {
    match arch {
        Architecture::DistilBert => ("pre_classifier", HeadActivation::Relu),
        Architecture::Bert => ("pooler.dense", HeadActivation::Tanh),
    }
}

impl ClassificationHead {
    /// Freshly initialized head
    pub fn new(config: &EncoderConfig, num_labels: usize, rng: &mut StdRng) -> Self {
        let (dense_name, activation) = head_layout(config.architecture);
        let h = config.hidden_size;
        Self {
            dense: Linear::new(dense_name, h, h, rng),
            activation,
            dropout: config.classifier_dropout,
            classifier: Linear::new("classifier", h, num_labels, rng),
        }
    }

    /// Load the head from `weights`, initializing whatever is absent
    ///
    /// Returns the head and the names of the layers that were initialized.
    pub fn from_weights(
        config: &EncoderConfig,
        num_labels: usize,
        weights: &mut WeightMap,
        rng: &mut StdRng,
    ) -> Result<(Self, Vec<String>)> {
        let (dense_name, activation) = head_layout(config.architecture);
        let h = config.hidden_size;
        let mut initialized = Vec::new();

        let dense = match Linear::from_weights(weights, dense_name, h, h)? {
            Some(layer) => layer,
            None => {
                initialized.push(dense_name.to_string());
                Linear::new(dense_name, h, h, rng)
            }
        };
        let classifier = match Linear::from_weights(weights, "classifier", h, num_labels)? {
            Some(layer) => layer,
            None => {
                initialized.push("classifier".to_string());
                Linear::new("classifier", h, num_labels, rng)
            }
        };

        let head = Self { dense, activation, dropout: config.classifier_dropout, classifier };
        Ok((head, initialized))
    }

    /// `cls` is `batch x hidden`; returns `batch x num_labels` logits
    pub fn forward(&self, cls: &Tensor, batch: usize, ctx: &mut Context) -> Tensor {
        let pooled = self.dense.forward(cls, batch);
        let pooled = match self.activation {
            HeadActivation::Relu => relu(&pooled),
            HeadActivation::Tanh => tanh(&pooled),
        };
        let pooled = dropout(&pooled, self.dropout, ctx);
        self.classifier.forward(&pooled, batch)
    }

    pub fn num_labels(&self) -> usize {
        self.classifier.out_features()
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.dense.parameters();
        params.extend(self.classifier.parameters());
        params
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.dense.parameters_mut();
        params.extend(self.classifier.parameters_mut());
        params
    }

    pub fn state_dict(&self) -> Vec<StateEntry> {
        let mut entries = self.dense.state_dict();
        entries.extend(self.classifier.state_dict());
        entries
    }
}

/// Pretrained encoder plus classification head
pub struct SequenceClassifier {
    encoder: Encoder,
    head: ClassificationHead,
    ctx: Context,
    parameter_names: Vec<String>,
    newly_initialized: Vec<String>,
    unused_weights: Vec<String>,
}

impl SequenceClassifier {
    /// Randomly initialized classifier, mostly for tests and smoke runs
    pub fn new(config: &EncoderConfig, num_labels: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let encoder = Encoder::new(config, &mut rng);
        let head = ClassificationHead::new(config, num_labels, &mut rng);
        Self::assemble(encoder, head, seed, Vec::new(), Vec::new())
    }

    /// Load the encoder (and the head, when the checkpoint has one)
    ///
    /// Head layers missing from the checkpoint are drawn from N(0, 0.02)
    /// with zero bias, from a generator seeded with `seed`; their names are
    /// available from [`newly_initialized`](Self::newly_initialized).
    pub fn from_pretrained(files: &ModelFiles, num_labels: usize, seed: u64) -> Result<Self> {
        if num_labels < 2 {
            return Err(Error::ConfigError(format!(
                "num_labels must be at least 2, got {num_labels}"
            )));
        }
        let config = files.encoder_config()?;
        let mut weights = WeightMap::load(&files.weights)?;
        let encoder = Encoder::from_weights(&config, &mut weights)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let (head, initialized) =
            ClassificationHead::from_weights(&config, num_labels, &mut weights, &mut rng)?;
        let unused = weights.remaining();
        Ok(Self::assemble(encoder, head, seed, initialized, unused))
    }

    fn assemble(
        encoder: Encoder,
        head: ClassificationHead,
        seed: u64,
        newly_initialized: Vec<String>,
        unused_weights: Vec<String>,
    ) -> Self {
        let mut model = Self {
            encoder,
            head,
            ctx: Context::with_seed(seed),
            parameter_names: Vec::new(),
            newly_initialized,
            unused_weights,
        };
        model.parameter_names = model.state_dict().into_iter().map(|e| e.name).collect();
        model
    }

    /// Classify a padded batch
    ///
    /// `input_ids` and `attention_mask` hold one equally long row per
    /// example. With `labels`, the mean cross-entropy is returned as well.
    pub fn forward(
        &mut self,
        input_ids: &[Vec<u32>],
        attention_mask: &[Vec<u32>],
        labels: Option<&[usize]>,
    ) -> Result<ClassifierOutput> {
        let batch = input_ids.len();
        let seq = input_ids.first().map_or(0, Vec::len);
        if batch == 0 || seq == 0 {
            return Err(Error::InvalidFormat("cannot classify an empty batch".into()));
        }
        let ragged = input_ids.iter().any(|row| row.len() != seq)
            || attention_mask.len() != batch
            || attention_mask.iter().any(|row| row.len() != seq);
        if ragged {
            return Err(Error::ShapeMismatch {
                name: "attention_mask".into(),
                expected: vec![batch, seq],
                actual: vec![attention_mask.len(), attention_mask.first().map_or(0, Vec::len)],
            });
        }

        let num_labels = self.num_labels();
        if let Some(labels) = labels {
            if labels.len() != batch {
                return Err(Error::ShapeMismatch {
                    name: "labels".into(),
                    expected: vec![batch],
                    actual: vec![labels.len()],
                });
            }
            if let Some(bad) = labels.iter().find(|&&l| l >= num_labels) {
                return Err(Error::InvalidFormat(format!(
                    "label {bad} out of range for {num_labels} classes"
                )));
            }
        }

        let ids = input_ids.concat();
        let mask = attention_mask.concat();
        let hidden = self.encoder.forward(&ids, &mask, batch, seq, &mut self.ctx)?;

        let cls_rows: Vec<usize> = (0..batch).map(|b| b * seq).collect();
        let cls = gather_rows(&hidden, &cls_rows, self.encoder.hidden_size());
        let logits = self.head.forward(&cls, batch, &mut self.ctx);

        let loss = labels.map(|labels| cross_entropy(&logits, labels, batch, num_labels));
        let logits = logits.to_vec().chunks(num_labels).map(<[f32]>::to_vec).collect();
        Ok(ClassifierOutput { loss, logits })
    }

    /// Enable dropout
    pub fn train(&mut self) {
        self.ctx.train();
    }

    /// Disable dropout
    pub fn eval(&mut self) {
        self.ctx.eval();
    }

    pub fn is_training(&self) -> bool {
        self.ctx.is_training()
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.encoder.config
    }

    pub fn num_labels(&self) -> usize {
        self.head.num_labels()
    }

    /// Head layers that were not in the checkpoint
    pub fn newly_initialized(&self) -> &[String] {
        &self.newly_initialized
    }

    /// Checkpoint tensors nothing used (pretraining heads and the like)
    pub fn unused_weights(&self) -> &[String] {
        &self.unused_weights
    }

    /// Canonical parameter names, in [`parameters_mut`](Self::parameters_mut) order
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn named_parameters(&self) -> Vec<(&str, &Tensor)> {
        let mut params = self.encoder.parameters();
        params.extend(self.head.parameters());
        self.parameter_names.iter().map(String::as_str).zip(params).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.encoder.parameters_mut();
        params.extend(self.head.parameters_mut());
        params
    }

    pub fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.len()).sum()
    }

    pub fn state_dict(&self) -> Vec<StateEntry> {
        let mut entries = self.encoder.state_dict();
        entries.extend(self.head.state_dict());
        entries
    }

    /// Write a loadable pretrained model directory
    ///
    /// Creates `config.json` (with the label names), `model.safetensors`,
    /// `vocab.txt` and `tokenizer_config.json`.
    pub fn save_pretrained(
        &self,
        dir: &Path,
        tokenizer: &WordPieceTokenizer,
        label_names: &[&str],
    ) -> Result<()> {
        if label_names.len() != self.num_labels() {
            return Err(Error::ConfigError(format!(
                "{} label names for a {}-label classifier",
                label_names.len(),
                self.num_labels()
            )));
        }
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Io(format!("Failed to create checkpoint dir {}: {e}", dir.display()))
        })?;

        let config = self.config().to_classifier_json(label_names);
        let config_json = serde_json::to_string_pretty(&config).map_err(|e| {
            Error::Serialization(format!("Failed to serialize config.json: {e}"))
        })?;
        std::fs::write(dir.join("config.json"), config_json)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("format".to_string(), "pt".to_string());
        save_safetensors(
            &dir.join("model.safetensors"),
            &self.state_dict(),
            self.config().architecture,
            metadata,
        )?;

        tokenizer.save_vocab(&dir.join("vocab.txt"))?;
        let tokenizer_config = serde_json::json!({
            "do_lower_case": tokenizer.config().lowercase,
            "model_max_length": self.config().max_position_embeddings,
        });
        std::fs::write(
            dir.join("tokenizer_config.json"),
            serde_json::to_string_pretty(&tokenizer_config)?,
        )?;
        Ok(())
    }
}
