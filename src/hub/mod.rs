//! Pretrained model resolution
//!
//! A model name is either a local directory (a downloaded model or a
//! checkpoint written by this crate) or a Hugging Face repository id, which
//! is downloaded into the hub cache. Only SafeTensors weights are used.

mod fetcher;
mod files;

pub use fetcher::{HubFetcher, CONVERSION_REVISION, MAIN_REVISION};
pub use files::ModelFiles;

use crate::error::Result;
use std::path::Path;

/// Find or download the files of `model_name`
///
/// `weights_revision` is an extra Hub revision searched for
/// `model.safetensors` when `main` only has pickle weights.
pub fn resolve_model(
    model_name: &str,
    cache_dir: Option<&Path>,
    weights_revision: Option<&str>,
) -> Result<ModelFiles> {
    let local = Path::new(model_name);
    if local.is_dir() {
        return ModelFiles::from_dir(local);
    }
    HubFetcher::new(cache_dir).with_weights_revision(weights_revision).fetch(model_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_directory_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("vocab.txt"), "[PAD]\n").unwrap();
        let files = resolve_model(dir.path().to_str().unwrap(), None, None).unwrap();
        assert_eq!(files.root, dir.path());
    }

    #[test]
    fn test_malformed_name_is_rejected_before_download() {
        let err = resolve_model("no-such-local-dir-or-repo", None, None).unwrap_err();
        assert!(err.to_string().contains("org/name"));
    }
}
