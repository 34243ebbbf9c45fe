//! impago CLI
//!
//! # Usage
//!
//! ```bash
//! # Fine-tune with the defaults
//! impago train
//!
//! # Pick the model and data
//! impago train --model-name distilbert-base-uncased --data-path data/loans.json
//!
//! # Re-score the best checkpoint
//! impago evaluate --checkpoint models/best_model --data-path data/loans.json
//! ```

use clap::Parser;
use impago::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
