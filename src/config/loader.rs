//! Loading a [`TrainSpec`] from YAML

use super::schema::TrainSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read, parse and validate a YAML training spec
pub fn load_spec<P: AsRef<Path>>(path: P) -> Result<TrainSpec> {
    let path = path.as_ref();
    let yaml = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let spec = parse_spec(&yaml)?;
    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;
    Ok(spec)
}

/// Parse YAML without validating; an empty document gives the defaults
pub fn parse_spec(yaml: &str) -> Result<TrainSpec> {
    if yaml.trim().is_empty() {
        return Ok(TrainSpec::default());
    }
    serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))
}
