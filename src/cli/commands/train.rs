//! Train command implementation

use crate::cli::{log, LogLevel};
use crate::config::{resolve_train_spec, TrainArgs};
use crate::finetune::{run_training, BEST_MODEL_DIR};

pub fn run_train(args: &TrainArgs, level: LogLevel) -> Result<(), String> {
    let spec = resolve_train_spec(args).map_err(|e| format!("Config error: {e}"))?;

    log(level, LogLevel::Verbose, &format!("  Model: {}", spec.model.name));
    log(level, LogLevel::Verbose, &format!("  Data: {}", spec.data.path.display()));
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Optimizer: {} (lr={}, weight_decay={})",
            spec.optimizer.name, spec.optimizer.lr, spec.optimizer.weight_decay
        ),
    );
    log(level, LogLevel::Verbose, &format!("  Epochs: {}", spec.training.epochs));
    log(level, LogLevel::Verbose, &format!("  Batch size: {}", spec.data.batch_size));

    let result = run_training(&spec, level).map_err(|e| format!("Training error: {e}"))?;

    match result.best_epoch {
        Some(epoch) => log(
            level,
            LogLevel::Normal,
            &format!(
                "\nTraining complete. Best F1 {:.4} at epoch {epoch}, saved to {}",
                result.best_f1,
                spec.training.output_dir.join(BEST_MODEL_DIR).display()
            ),
        ),
        None => log(
            level,
            LogLevel::Normal,
            "\nTraining complete. No epoch reached an F1 above 0, so no best model was saved",
        ),
    }
    Ok(())
}
