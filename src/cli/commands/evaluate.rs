//! Evaluate command implementation

use crate::cli::{log, LogLevel};
use crate::config::EvaluateArgs;
use crate::finetune::{evaluate_checkpoint, load_metadata, CheckpointEval};

pub fn run_evaluate(args: &EvaluateArgs, level: LogLevel) -> Result<(), String> {
    if let Ok(meta) = load_metadata(&args.checkpoint) {
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "Checkpoint from epoch {} of {} (test F1 {:.4})",
                meta.epoch, meta.model_name, meta.test_metrics.f1
            ),
        );
    }

    let eval = CheckpointEval {
        checkpoint: args.checkpoint.clone(),
        data_path: args.data_path.clone(),
        full: args.full,
        test_size: args.test_size,
        seed: args.seed,
        batch_size: args.batch_size,
        max_length: args.max_length,
    };
    let (loss, metrics) =
        evaluate_checkpoint(&eval, level).map_err(|e| format!("Evaluation error: {e}"))?;

    log(level, LogLevel::Normal, &format!("Test Loss: {loss:.4}"));
    log(level, LogLevel::Normal, &format!("Test Metrics: {metrics}"));
    Ok(())
}
