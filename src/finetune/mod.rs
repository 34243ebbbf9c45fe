//! Fine-tuning a pretrained encoder for sequence classification
//!
//! - [`SequenceClassifier`]: encoder plus DistilBERT/BERT classification head
//! - [`train`], [`train_epoch`], [`evaluate`]: the epoch loop
//! - [`save_checkpoint`] and friends: `best_model/` and `latest_model/`
//!   directories that load back as pretrained models

mod checkpoint;
mod classifier;
mod trainer;

pub use checkpoint::{
    load_metadata, load_optimizer_state, save_checkpoint, CheckpointMetadata, BEST_MODEL_DIR,
    LATEST_MODEL_DIR,
};
pub use classifier::{ClassificationHead, ClassifierOutput, SequenceClassifier};
pub use trainer::{
    evaluate, evaluate_checkpoint, run_training, train, train_epoch, CheckpointEval, TrainOptions,
    TrainResult,
};
