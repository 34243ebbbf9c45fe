//! Weight loading and saving for encoder checkpoints
//!
//! Loads SafeTensors files (f32, f16, bf16) into a [`WeightMap`] keyed by
//! canonical names: the Hugging Face name without the `distilbert.` / `bert.`
//! prefix, with legacy `gamma` / `beta` LayerNorm names normalized. Layers
//! take their tensors out of the map by name and shape, so anything left over
//! afterwards (TinyBERT's `fit_denses`, BERT's `cls.*` pretraining heads) is
//! reported rather than silently used.
//!
//! Saving goes the other way and writes Hugging Face names and layouts, so a
//! saved checkpoint loads back here or in `transformers`.

mod convert;
mod detect;
mod mapping;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub(crate) use convert::tensor_to_f32_vec;
pub use detect::{detect_architecture, find_safetensors_files};
pub use mapping::{canonical_name, checkpoint_name, embedding_names, layer_names};
pub use mapping::{EmbeddingNames, LayerNames};

/// A tensor as stored on disk
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// One entry of a model's state, in checkpoint layout
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    /// Canonical name (no encoder prefix)
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Loaded tensors keyed by canonical name
#[derive(Debug, Default)]
pub struct WeightMap {
    tensors: HashMap<String, RawTensor>,
}

impl WeightMap {
    /// Empty map, for building a model from scratch
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every SafeTensors file under `model_path`
    pub fn load(model_path: &Path) -> Result<Self> {
        use safetensors::SafeTensors;

        let st_files = find_safetensors_files(model_path)?;
        if st_files.is_empty() {
            return Err(Error::ConfigError(format!(
                "No SafeTensors files found in {}",
                model_path.display()
            )));
        }

        let mut tensors = HashMap::new();
        for st_path in &st_files {
            let data = std::fs::read(st_path).map_err(|e| {
                Error::Io(format!("Failed to read {}: {e}", st_path.display()))
            })?;
            let parsed = SafeTensors::deserialize(&data).map_err(|e| {
                Error::InvalidFormat(format!(
                    "Failed to parse SafeTensors {}: {e}",
                    st_path.display()
                ))
            })?;

            for name in parsed.names() {
                let view = parsed.tensor(name).map_err(|e| {
                    Error::InvalidFormat(format!("Failed to read tensor {name}: {e}"))
                })?;
                let Some(values) = tensor_to_f32_vec(&view) else {
                    // Integer buffers such as `position_ids` are not weights
                    continue;
                };
                tensors.insert(
                    canonical_name(name),
                    RawTensor { shape: view.shape().to_vec(), data: values },
                );
            }
        }

        Ok(Self { tensors })
    }

    /// Insert a tensor under its canonical name
    pub fn insert(&mut self, name: &str, shape: Vec<usize>, data: Vec<f32>) {
        self.tensors.insert(canonical_name(name), RawTensor { shape, data });
    }

    /// Whether a tensor with this canonical name is present
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Number of tensors still in the map
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether every tensor has been taken
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Remove a tensor, checking its shape. `Ok(None)` when it is absent.
    pub fn take(&mut self, name: &str, expected: &[usize]) -> Result<Option<Vec<f32>>> {
        match self.tensors.remove(name) {
            None => Ok(None),
            Some(raw) if raw.shape == expected => Ok(Some(raw.data)),
            Some(raw) => Err(Error::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: raw.shape,
            }),
        }
    }

    /// Remove a tensor that must be present
    pub fn require(&mut self, name: &str, expected: &[usize]) -> Result<Vec<f32>> {
        self.take(name, expected)?
            .ok_or_else(|| Error::ConfigError(format!("Missing weight tensor {name}")))
    }

    /// Names nobody took, sorted
    pub fn remaining(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tensors.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Write `entries` as a SafeTensors file, prefixing encoder names for `arch`
pub fn save_safetensors(
    path: &Path,
    entries: &[StateEntry],
    arch: crate::transformer::Architecture,
    metadata: BTreeMap<String, String>,
) -> Result<()> {
    let renamed: Vec<(String, &StateEntry)> =
        entries.iter().map(|e| (checkpoint_name(arch, &e.name), e)).collect();
    write_safetensors(path, renamed.iter().map(|(name, e)| (name.as_str(), *e)), metadata)
}

/// Write named entries as-is
pub(crate) fn write_safetensors<'a, I>(
    path: &Path,
    entries: I,
    metadata: BTreeMap<String, String>,
) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a StateEntry)>,
{
    let entries: Vec<(&str, &StateEntry)> = entries.into_iter().collect();
    let mut views = Vec::with_capacity(entries.len());
    for (name, entry) in &entries {
        let bytes: &[u8] = bytemuck::cast_slice(entry.data.as_slice());
        let view = safetensors::tensor::TensorView::new(
            safetensors::tensor::Dtype::F32,
            entry.shape.clone(),
            bytes,
        )
        .map_err(|e| Error::Serialization(format!("Invalid tensor {name}: {e}")))?;
        views.push((*name, view));
    }

    let metadata: HashMap<String, String> = metadata.into_iter().collect();
    let metadata = if metadata.is_empty() { None } else { Some(metadata) };
    let bytes = safetensors::serialize(views, &metadata).map_err(|e| {
        Error::Serialization(format!("SafeTensors serialization failed: {e}"))
    })?;
    std::fs::write(path, bytes)
        .map_err(|e| Error::Io(format!("Failed to write {}: {e}", path.display())))?;
    Ok(())
}

/// String metadata from a SafeTensors header
pub(crate) fn read_safetensors_metadata(path: &Path) -> Result<BTreeMap<String, String>> {
    let data = std::fs::read(path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {e}", path.display())))?;
    let (_, header) = safetensors::SafeTensors::read_metadata(&data).map_err(|e| {
        Error::InvalidFormat(format!("Failed to parse SafeTensors {}: {e}", path.display()))
    })?;
    Ok(header.metadata().clone().unwrap_or_default().into_iter().collect())
}

/// Read a SafeTensors file into raw tensors keyed by their stored names
pub(crate) fn read_safetensors(path: &Path) -> Result<BTreeMap<String, RawTensor>> {
    let data = std::fs::read(path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {e}", path.display())))?;
    let parsed = safetensors::SafeTensors::deserialize(&data).map_err(|e| {
        Error::InvalidFormat(format!("Failed to parse SafeTensors {}: {e}", path.display()))
    })?;
    let mut out = BTreeMap::new();
    for name in parsed.names() {
        let view = parsed
            .tensor(name)
            .map_err(|e| Error::InvalidFormat(format!("Failed to read tensor {name}: {e}")))?;
        if let Some(values) = tensor_to_f32_vec(&view) {
            out.insert(name.to_string(), RawTensor { shape: view.shape().to_vec(), data: values });
        }
    }
    Ok(out)
}
