//! Configuration validation
//!
//! Checks value ranges before any data or model is loaded. Paths are not
//! checked here: the dataset and model loaders report missing files with
//! more context.

use super::schema::TrainSpec;

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid learning rate: {0} (must be finite and > 0.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid weight decay: {0} (must be finite and >= 0.0)")]
    InvalidWeightDecay(f32),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid test size: {0} (must be in (0.0, 1.0))")]
    InvalidTestSize(f64),

    #[error("Invalid max length: {0} (must be >= 2 to fit [CLS] and [SEP])")]
    InvalidMaxLength(usize),

    #[error("Invalid optimizer: {0} (must be adamw)")]
    InvalidOptimizer(String),

    #[error("Model name cannot be empty")]
    EmptyModelName,
}

/// Validate a training specification
pub fn validate_config(spec: &TrainSpec) -> Result<(), ValidationError> {
    if spec.model.name.trim().is_empty() {
        return Err(ValidationError::EmptyModelName);
    }
    if spec.model.max_length < 2 {
        return Err(ValidationError::InvalidMaxLength(spec.model.max_length));
    }
    if spec.data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.data.batch_size));
    }
    if !(spec.data.test_size > 0.0 && spec.data.test_size < 1.0) {
        return Err(ValidationError::InvalidTestSize(spec.data.test_size));
    }
    if !spec.optimizer.name.eq_ignore_ascii_case("adamw") {
        return Err(ValidationError::InvalidOptimizer(spec.optimizer.name.clone()));
    }
    if !spec.optimizer.lr.is_finite() || spec.optimizer.lr <= 0.0 {
        return Err(ValidationError::InvalidLearningRate(spec.optimizer.lr));
    }
    if !spec.optimizer.weight_decay.is_finite() || spec.optimizer.weight_decay < 0.0 {
        return Err(ValidationError::InvalidWeightDecay(spec.optimizer.weight_decay));
    }
    if spec.training.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(spec.training.epochs));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&TrainSpec::default()).is_ok());
    }

    #[test]
    fn test_rejects_each_bad_field() {
        let mut spec = TrainSpec::default();
        spec.data.batch_size = 0;
        assert_eq!(validate_config(&spec), Err(ValidationError::InvalidBatchSize(0)));

        let mut spec = TrainSpec::default();
        spec.training.epochs = 0;
        assert_eq!(validate_config(&spec), Err(ValidationError::InvalidEpochs(0)));

        let mut spec = TrainSpec::default();
        spec.model.max_length = 1;
        assert_eq!(validate_config(&spec), Err(ValidationError::InvalidMaxLength(1)));

        let mut spec = TrainSpec::default();
        spec.optimizer.lr = f32::NAN;
        assert!(matches!(validate_config(&spec), Err(ValidationError::InvalidLearningRate(_))));

        let mut spec = TrainSpec::default();
        spec.optimizer.weight_decay = -0.1;
        assert!(validate_config(&spec).is_err());

        let mut spec = TrainSpec::default();
        spec.optimizer.name = "sgd".into();
        assert!(matches!(validate_config(&spec), Err(ValidationError::InvalidOptimizer(_))));

        let mut spec = TrainSpec::default();
        spec.model.name = "  ".into();
        assert_eq!(validate_config(&spec), Err(ValidationError::EmptyModelName));
    }

    #[test]
    fn test_test_size_bounds() {
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let mut spec = TrainSpec::default();
            spec.data.test_size = bad;
            assert!(validate_config(&spec).is_err(), "accepted test_size {bad}");
        }
    }

    proptest! {
        #[test]
        fn prop_open_unit_interval_test_size_is_valid(test_size in 0.001f64..0.999) {
            let mut spec = TrainSpec::default();
            spec.data.test_size = test_size;
            prop_assert!(validate_config(&spec).is_ok());
        }
    }
}
