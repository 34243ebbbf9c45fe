//! Epoch loop for sequence classification fine-tuning
//!
//! Each epoch runs one pass over the training loader and one evaluation pass
//! over the held-out loader. The checkpoint with the highest test F1 is kept
//! in `best_model/` (strict improvement over the best so far, starting from
//! 0.0, so ties keep the earlier epoch) and every epoch is written to
//! `latest_model/`.

use super::checkpoint::{save_checkpoint, CheckpointMetadata, BEST_MODEL_DIR, LATEST_MODEL_DIR};
use super::classifier::SequenceClassifier;
use crate::autograd::{backward, no_grad, softmax_rows};
use crate::cli::{log, LogLevel};
use crate::config::TrainSpec;
use crate::data::{
    create_dataloaders, label_distribution, load_dataset, split_dataset, DataLoader, TextDataset,
    LABEL_NAMES,
};
use crate::error::{Error, Result};
use crate::eval::{classification_report, compute_metrics, confusion_matrix, EvalMetrics};
use crate::hub::{resolve_model, ModelFiles};
use crate::optim::{AdamW, Optimizer};
use crate::tokenizer::WordPieceTokenizer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Samples shown in the debug report
const DEBUG_SAMPLES: usize = 10;
/// Characters of text shown per debug sample
const PREVIEW_CHARS: usize = 100;

/// Outcome of a full training run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainResult {
    /// Mean batch loss per epoch
    pub train_losses: Vec<f64>,
    pub test_losses: Vec<f64>,
    pub test_metrics: Vec<EvalMetrics>,
    /// 1-based epoch saved as `best_model`, if any epoch beat F1 0.0
    pub best_epoch: Option<usize>,
    pub best_f1: f64,
}

/// Settings of the epoch loop
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub num_epochs: usize,
    /// Receives `best_model/` and `latest_model/`
    pub output_dir: PathBuf,
    /// Recorded in checkpoint metadata
    pub model_name: String,
}

/// Everything the evaluation pass collected
#[derive(Debug, Clone, Default)]
struct Predictions {
    /// Dataset row of each prediction
    indices: Vec<usize>,
    y_true: Vec<usize>,
    y_pred: Vec<usize>,
    /// Probability of the positive class
    positive_prob: Vec<f32>,
}

fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// One training pass; returns the mean of the batch losses
pub fn train_epoch<O: Optimizer>(
    model: &mut SequenceClassifier,
    loader: &DataLoader,
    optimizer: &mut O,
    epoch: usize,
    level: LogLevel,
) -> Result<f64> {
    model.train();
    let num_batches = loader.len();
    let mut total = 0.0;

    for (i, batch) in loader.batches(epoch).enumerate() {
        optimizer.zero_grad_refs(&mut model.parameters_mut());

        let labels = Some(batch.labels.as_slice());
        let output = model.forward(&batch.input_ids, &batch.attention_mask, labels)?;
        let mut loss = output
            .loss
            .ok_or_else(|| Error::InvalidFormat("forward with labels returned no loss".into()))?;
        let value = f64::from(loss.item());
        backward(&mut loss, None);
        optimizer.step_refs(&mut model.parameters_mut());

        total += value;
        log(level, LogLevel::Verbose, &format!("  batch {}/{num_batches}: loss {value:.4}", i + 1));
    }

    Ok(if num_batches == 0 { 0.0 } else { total / num_batches as f64 })
}

fn predict(model: &mut SequenceClassifier, loader: &DataLoader) -> Result<(f64, Predictions)> {
    model.eval();
    let num_labels = model.num_labels();
    let mut preds = Predictions::default();
    let mut total = 0.0;

    no_grad(|| -> Result<()> {
        for batch in loader.batches(0) {
            let labels = Some(batch.labels.as_slice());
            let output = model.forward(&batch.input_ids, &batch.attention_mask, labels)?;
            total += output.loss.map_or(0.0, |l| f64::from(l.item()));
            for (row, (&label, &idx)) in
                output.logits.iter().zip(batch.labels.iter().zip(&batch.indices))
            {
                let probs = softmax_rows(row, 1, num_labels);
                preds.indices.push(idx);
                preds.y_true.push(label);
                preds.y_pred.push(argmax(row));
                preds.positive_prob.push(probs.get(1).copied().unwrap_or(0.0));
            }
        }
        Ok(())
    })?;

    let num_batches = loader.len();
    let mean = if num_batches == 0 { 0.0 } else { total / num_batches as f64 };
    Ok((mean, preds))
}

fn counts(labels: &[usize]) -> BTreeMap<usize, usize> {
    let mut out = BTreeMap::new();
    for &l in labels {
        *out.entry(l).or_insert(0) += 1;
    }
    out
}

/// First `PREVIEW_CHARS` characters, with "..." only when text was cut
fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Diagnostic dump of an evaluation pass
fn debug_report(loader: &DataLoader, preds: &Predictions) -> String {
    let dataset: &TextDataset = loader.dataset();
    let mut lines = vec![
        "Debug - Evaluation:".to_string(),
        format!("Test dataset size: {}", dataset.len()),
        format!("Number of batches: {}", loader.len()),
        format!("Batch size: {}", loader.batch_size()),
        format!("Unique predictions: {:?}", counts(&preds.y_pred)),
        format!("Unique true labels: {:?}", counts(&preds.y_true)),
        String::new(),
        "Sample predictions:".to_string(),
    ];

    let mut rng = StdRng::seed_from_u64(loader.seed());
    let n = preds.y_pred.len();
    for k in rand::seq::index::sample(&mut rng, n, DEBUG_SAMPLES.min(n)) {
        let text = dataset.texts.get(preds.indices[k]).map_or("", String::as_str);
        lines.push(format!("Text: {}", preview(text)));
        lines.push(format!(
            "True label: {}, Predicted: {}, Probability: {:.4}",
            preds.y_true[k], preds.y_pred[k], preds.positive_prob[k]
        ));
    }

    lines.push(String::new());
    lines.push("Confusion matrix:".to_string());
    lines.push(confusion_matrix(&preds.y_pred, &preds.y_true).to_string());
    lines.push("Classification report:".to_string());
    lines.push(classification_report(&preds.y_pred, &preds.y_true, &LABEL_NAMES));
    lines.join("\n")
}

/// Evaluation pass without parameter updates; returns mean batch loss and metrics
///
/// Predictions are the argmax of the logits. With `debug`, a report of the
/// predictions (label counts, sample texts, confusion matrix,
/// classification report) is printed first.
pub fn evaluate(
    model: &mut SequenceClassifier,
    loader: &DataLoader,
    debug: bool,
    level: LogLevel,
) -> Result<(f64, EvalMetrics)> {
    let (loss, preds) = predict(model, loader)?;
    if debug {
        log(level, LogLevel::Normal, &debug_report(loader, &preds));
    }

    let (metrics, error) = compute_metrics(&preds.y_true, &preds.y_pred);
    if let Some(e) = error {
        log(level, LogLevel::Normal, &format!("Error calculating metrics: {e}"));
        log(level, LogLevel::Normal, &format!("Unique predictions: {:?}", counts(&preds.y_pred)));
        log(level, LogLevel::Normal, &format!("Unique true labels: {:?}", counts(&preds.y_true)));
    }
    Ok((loss, metrics))
}

/// Run the epoch loop, writing `best_model/` and `latest_model/` checkpoints
pub fn train(
    model: &mut SequenceClassifier,
    train_loader: &DataLoader,
    test_loader: &DataLoader,
    optimizer: &mut AdamW,
    tokenizer: &WordPieceTokenizer,
    options: &TrainOptions,
    level: LogLevel,
) -> Result<TrainResult> {
    std::fs::create_dir_all(&options.output_dir).map_err(|e| {
        Error::Io(format!("Failed to create {}: {e}", options.output_dir.display()))
    })?;
    let best_dir = options.output_dir.join(BEST_MODEL_DIR);
    let latest_dir = options.output_dir.join(LATEST_MODEL_DIR);

    let mut result = TrainResult::default();
    for epoch in 0..options.num_epochs {
        log(level, LogLevel::Normal, &format!("\nEpoch {}/{}", epoch + 1, options.num_epochs));

        let train_loss = train_epoch(model, train_loader, optimizer, epoch, level)?;
        let (test_loss, metrics) = evaluate(model, test_loader, epoch == 0, level)?;

        log(
            level,
            LogLevel::Normal,
            &format!("Train Loss: {train_loss:.4}, Test Loss: {test_loss:.4}"),
        );
        log(level, LogLevel::Normal, &format!("Test Metrics: {metrics}"));

        let metadata = CheckpointMetadata {
            epoch: epoch + 1,
            train_loss,
            test_loss,
            test_metrics: metrics,
            learning_rate: optimizer.lr(),
            model_name: options.model_name.clone(),
        };
        if metrics.f1 > result.best_f1 {
            result.best_f1 = metrics.f1;
            result.best_epoch = Some(epoch + 1);
            save_checkpoint(&best_dir, model, optimizer, tokenizer, &metadata)?;
            log(level, LogLevel::Normal, &format!("Saved best model with F1: {:.4}", metrics.f1));
        }
        save_checkpoint(&latest_dir, model, optimizer, tokenizer, &metadata)?;

        result.train_losses.push(train_loss);
        result.test_losses.push(test_loss);
        result.test_metrics.push(metrics);
    }
    Ok(result)
}

/// Build a classifier from `files` and log what the checkpoint did not cover
fn load_classifier(files: &ModelFiles, seed: u64, level: LogLevel) -> Result<SequenceClassifier> {
    let model = SequenceClassifier::from_pretrained(files, LABEL_NAMES.len(), seed)?;
    for name in model.newly_initialized() {
        log(level, LogLevel::Verbose, &format!("Initialized {name} from N(0, 0.02)"));
    }
    if !model.unused_weights().is_empty() {
        log(
            level,
            LogLevel::Verbose,
            &format!("Unused checkpoint tensors: {}", model.unused_weights().join(", ")),
        );
    }
    log(level, LogLevel::Verbose, &format!("Parameters: {}", model.num_parameters()));
    Ok(model)
}

/// Full training run from a resolved [`TrainSpec`]
pub fn run_training(spec: &TrainSpec, level: LogLevel) -> Result<TrainResult> {
    log(level, LogLevel::Normal, "Using device: cpu");

    let samples = load_dataset(&spec.data.path)?;
    let (train_set, test_set) = split_dataset(&samples, spec.data.test_size, spec.training.seed)?;
    log(level, LogLevel::Normal, &format!("Train size: {}", train_set.len()));
    log(level, LogLevel::Normal, &format!("Test size: {}", test_set.len()));
    log(
        level,
        LogLevel::Normal,
        &format!("Train label distribution: {:?}", label_distribution(&train_set)),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("Test label distribution: {:?}", label_distribution(&test_set)),
    );

    let files = resolve_model(
        &spec.model.name,
        spec.model.cache_dir.as_deref(),
        spec.model.weights_revision.as_deref(),
    )?;
    log(level, LogLevel::Verbose, &format!("Model files: {}", files.root.display()));
    let tokenizer = files.load_tokenizer(&spec.model.name)?;
    let (train_loader, test_loader) = create_dataloaders(
        &train_set,
        &test_set,
        &tokenizer,
        spec.data.batch_size,
        spec.model.max_length,
        spec.training.seed,
    )?;

    let mut model = load_classifier(&files, spec.training.seed, level)?;
    let mut optimizer =
        AdamW::default_params(spec.optimizer.lr).with_weight_decay(spec.optimizer.weight_decay);

    let options = TrainOptions {
        num_epochs: spec.training.epochs,
        output_dir: spec.training.output_dir.clone(),
        model_name: spec.model.name.clone(),
    };
    train(&mut model, &train_loader, &test_loader, &mut optimizer, &tokenizer, &options, level)
}

/// What to evaluate a saved checkpoint on
#[derive(Debug, Clone)]
pub struct CheckpointEval {
    pub checkpoint: PathBuf,
    pub data_path: PathBuf,
    /// Score every record instead of the held-out split
    pub full: bool,
    pub test_size: f64,
    pub seed: u64,
    pub batch_size: usize,
    pub max_length: usize,
}

/// Evaluate a checkpoint directory, printing the debug report
pub fn evaluate_checkpoint(eval: &CheckpointEval, level: LogLevel) -> Result<(f64, EvalMetrics)> {
    let files = ModelFiles::from_dir(&eval.checkpoint)?;
    let tokenizer = files.load_tokenizer(&checkpoint_label(&eval.checkpoint))?;
    let mut model = load_classifier(&files, eval.seed, level)?;

    let samples = load_dataset(&eval.data_path)?;
    let samples = if eval.full {
        samples
    } else {
        split_dataset(&samples, eval.test_size, eval.seed)?.1
    };
    log(level, LogLevel::Normal, &format!("Evaluating on {} samples", samples.len()));

    let dataset = TextDataset::new(&samples, &tokenizer, eval.max_length)?;
    let loader = DataLoader::new(dataset, eval.batch_size, false, eval.seed, tokenizer.pad_id());
    evaluate(&mut model, &loader, true, level)
}

fn checkpoint_label(dir: &Path) -> String {
    dir.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned())
}
