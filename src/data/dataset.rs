//! Loan dataset loading

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Class names, indexed by label
pub const LABEL_NAMES: [&str; 2] = ["Not Defaulted", "Defaulted"];

/// One labelled loan description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSample {
    pub text: String,
    /// 0 = not defaulted, 1 = defaulted
    pub label: usize,
}

#[derive(Deserialize)]
struct RawRecord {
    text: String,
    label: Value,
}

fn parse_label(value: &Value) -> Option<usize> {
    match value {
        Value::Bool(b) => Some(usize::from(*b)),
        Value::Number(n) => match n.as_u64() {
            Some(v @ (0 | 1)) => Some(v as usize),
            _ => None,
        },
        _ => None,
    }
}

fn parse_record(index: usize, value: Value) -> Result<LoanSample> {
    let raw: RawRecord = serde_json::from_value(value)
        .map_err(|e| Error::InvalidFormat(format!("record {index}: {e}")))?;
    let label = parse_label(&raw.label).ok_or_else(|| {
        Error::InvalidFormat(format!("record {index}: label {} is not 0/1 or a boolean", raw.label))
    })?;
    Ok(LoanSample { text: raw.text, label })
}

/// Parse a JSON array of records, or JSON Lines
pub fn parse_dataset(content: &str) -> Result<Vec<LoanSample>> {
    let trimmed = content.trim_start();
    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map_err(|e| Error::InvalidFormat(format!("dataset is not a JSON array: {e}")))?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| Error::InvalidFormat(format!("line {}: {e}", n + 1)))
            })
            .collect::<Result<_>>()?
    };

    if values.is_empty() {
        return Err(Error::InvalidFormat("dataset has no records".into()));
    }
    values.into_iter().enumerate().map(|(i, v)| parse_record(i, v)).collect()
}

/// Load the dataset file at `path`
pub fn load_dataset(path: &Path) -> Result<Vec<LoanSample>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {e}", path.display())))?;
    parse_dataset(&content)
}

/// Count of samples per label
pub fn label_distribution(samples: &[LoanSample]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for sample in samples {
        *counts.entry(sample.label).or_insert(0) += 1;
    }
    counts
}
