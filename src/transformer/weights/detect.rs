//! SafeTensors file discovery and architecture detection

use crate::error::{Error, Result};
use crate::transformer::Architecture;
use std::path::{Path, PathBuf};

/// Weight files that are never loaded: they unpickle arbitrary Python objects
const PICKLE_WEIGHTS: [&str; 2] = ["pytorch_model.bin", "model.pt"];

/// Find SafeTensors files in a directory or return a single file
///
/// A directory that only holds pickle weights is an error naming the file,
/// so the caller can convert it instead of getting a bare "not found".
pub fn find_safetensors_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if path.extension().is_some_and(|e| e == "safetensors") {
            files.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        let single = path.join("model.safetensors");
        if single.exists() {
            files.push(single);
        } else {
            // Sharded: model-00001-of-00002.safetensors
            for entry in std::fs::read_dir(path)?.flatten() {
                let p = entry.path();
                if p.extension().is_some_and(|e| e == "safetensors")
                    && p.file_name().is_some_and(|n| n != "optimizer.safetensors")
                {
                    files.push(p);
                }
            }
            files.sort();
        }

        if files.is_empty() {
            if let Some(pickle) = PICKLE_WEIGHTS.iter().find(|f| path.join(f).exists()) {
                return Err(Error::InvalidFormat(format!(
                    "{} only has {pickle}; pickle weights are not loaded, convert them to model.safetensors",
                    path.display()
                )));
            }
        }
    }

    Ok(files)
}

/// Guess the encoder family from canonical tensor names
pub fn detect_architecture<'a, I>(names: I) -> Option<Architecture>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        if name.starts_with("transformer.layer.") {
            return Some(Architecture::DistilBert);
        }
        if name.starts_with("encoder.layer.") {
            return Some(Architecture::Bert);
        }
    }
    None
}
