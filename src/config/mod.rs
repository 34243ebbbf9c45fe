//! Run configuration: YAML spec, validation and command line arguments

mod cli;
mod loader;
mod schema;
mod validate;

pub use cli::{
    apply_overrides, parse_args, resolve_train_spec, Cli, Command, EvaluateArgs, TrainArgs,
};
pub use loader::{load_spec, parse_spec};
pub use schema::{DataSpec, ModelSpec, OptimSpec, TrainSpec, TrainingParams};
pub use validate::{validate_config, ValidationError};
