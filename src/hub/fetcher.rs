//! Hugging Face Hub downloads through the `hf-hub` sync API

use super::files::ModelFiles;
use crate::error::{Error, Result};
use hf_hub::api::sync::{Api, ApiBuilder, ApiError, ApiRepo};
use hf_hub::{Repo, RepoType};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Branch holding config and tokenizer files
pub const MAIN_REVISION: &str = "main";

/// Where the Hub's SafeTensors conversion bot publishes `model.safetensors`
/// for repositories that only ship pickle weights on `main`
pub const CONVERSION_REVISION: &str = "refs/pr/1";

/// Tokenizer files; at least one of the first two must exist
const TOKENIZER_FILES: [&str; 3] = ["vocab.txt", "tokenizer.json", "tokenizer_config.json"];

/// Downloads pretrained models into the Hugging Face cache
pub struct HubFetcher {
    token: Option<String>,
    cache_dir: PathBuf,
    weights_revision: Option<String>,
}

impl HubFetcher {
    /// Fetcher using the resolved token and the given or default cache
    pub fn new(cache_dir: Option<&Path>) -> Self {
        Self {
            token: Self::resolve_token(),
            cache_dir: cache_dir.map_or_else(Self::default_cache_dir, Path::to_path_buf),
            weights_revision: None,
        }
    }

    /// Look for `model.safetensors` on `revision` when `main` lacks it
    pub fn with_weights_revision(mut self, revision: Option<&str>) -> Self {
        self.weights_revision = revision.map(str::to_string);
        self
    }

    /// Revisions searched for `model.safetensors`, in order
    ///
    /// `main` first, then the configured revision, then the conversion bot's.
    pub fn weight_revisions(&self) -> Vec<String> {
        let mut revisions = vec![MAIN_REVISION.to_string()];
        let extra = self.weights_revision.as_deref().into_iter().chain([CONVERSION_REVISION]);
        for revision in extra {
            if !revisions.iter().any(|r| r == revision) {
                revisions.push(revision.to_string());
            }
        }
        revisions
    }

    /// Resolve token from multiple sources
    ///
    /// Priority:
    /// 1. HF_TOKEN environment variable
    /// 2. ~/.huggingface/token file
    pub fn resolve_token() -> Option<String> {
        if let Ok(token) = std::env::var("HF_TOKEN") {
            if !token.is_empty() {
                return Some(token);
            }
        }

        let token_path = dirs::home_dir()?.join(".huggingface").join("token");
        let token = std::fs::read_to_string(token_path).ok()?.trim().to_string();
        (!token.is_empty()).then_some(token)
    }

    /// `~/.cache/huggingface/hub` or the platform equivalent
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("huggingface")
            .join("hub")
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Validate an `org/name` repository ID
    pub fn parse_repo_id(repo_id: &str) -> Result<(&str, &str)> {
        match repo_id.split('/').collect::<Vec<_>>().as_slice() {
            [org, name] if !org.is_empty() && !name.is_empty() => Ok((*org, *name)),
            _ => Err(Error::ConfigError(format!(
                "`{repo_id}` is neither a local directory nor an org/name repository id"
            ))),
        }
    }

    fn build_api(&self) -> Result<Api> {
        let mut builder = ApiBuilder::new().with_cache_dir(self.cache_dir.clone());
        if let Some(token) = &self.token {
            builder = builder.with_token(Some(token.clone()));
        }
        builder.build().map_err(|e| Error::Fetch(format!("Failed to initialize HF API: {e}")))
    }

    /// Download one file; `Ok(None)` when the repository does not have it
    fn download_file(repo: &ApiRepo, repo_id: &str, file: &str) -> Result<Option<PathBuf>> {
        match repo.get(file) {
            Ok(path) => Ok(Some(path)),
            Err(ApiError::RequestError(e)) if e.to_string().contains("404") => Ok(None),
            Err(e) => Err(Error::Fetch(format!("{repo_id}/{file}: {e}"))),
        }
    }

    /// Download `model.safetensors` from the first revision that has it
    fn fetch_weights(&self, api: &Api, repo_id: &str) -> Result<PathBuf> {
        let revisions = self.weight_revisions();
        for revision in &revisions {
            let repo = api.repo(Repo::with_revision(
                repo_id.to_string(),
                RepoType::Model,
                revision.clone(),
            ));
            if let Some(path) = Self::download_file(&repo, repo_id, WEIGHTS_FILE)? {
                return Ok(path);
            }
        }
        Err(Error::Fetch(format!(
            "{repo_id} has no {WEIGHTS_FILE} on {}; pickle weights are not loaded, \
             convert the checkpoint to SafeTensors and pass its directory",
            revisions.join(", ")
        )))
    }

    /// Download config, weights and tokenizer files of `repo_id`
    pub fn fetch(&self, repo_id: &str) -> Result<ModelFiles> {
        Self::parse_repo_id(repo_id)?;
        let api = self.build_api()?;
        let repo = api.model(repo_id.to_string());

        let config = Self::download_file(&repo, repo_id, CONFIG_FILE)?
            .ok_or_else(|| Error::Fetch(format!("{repo_id} has no {CONFIG_FILE}")))?;
        let weights = self.fetch_weights(&api, repo_id)?;

        let mut tokenizer = [None, None, None];
        for (slot, file) in tokenizer.iter_mut().zip(TOKENIZER_FILES) {
            *slot = Self::download_file(&repo, repo_id, file)?;
        }
        let [vocab, tokenizer_json, tokenizer_config] = tokenizer;
        if vocab.is_none() && tokenizer_json.is_none() {
            return Err(Error::Fetch(format!("{repo_id} has neither vocab.txt nor tokenizer.json")));
        }

        let root = config
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Fetch(format!("{repo_id}: empty download path")))?;
        Ok(ModelFiles {
            config,
            weights,
            root,
            vocab,
            tokenizer_json,
            tokenizer_config,
        })
    }
}
