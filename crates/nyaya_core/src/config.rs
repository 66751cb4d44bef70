//! Agent configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file
//! (`nyaya.toml` unless a path is given), then `NYAYA_*` environment
//! variables with `__` separating nested keys (`NYAYA_OLLAMA__BASE_URL`).
//! `TAVILY_API_KEY` fills the primary web-search credential when the file and
//! `NYAYA_` variables leave it unset.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::domain::Language;
use crate::error::AppError;

pub const DEFAULT_CONFIG_FILE: &str = "nyaya.toml";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LanguageMismatchPolicy {
    /// Return the generated text flagged with a caveat.
    #[default]
    Caveat,
    /// Fail the query with a language mismatch error.
    Reject,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebSearchBackend {
    Tavily,
    Duckduckgo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            generation_model: "navarasa".to_string(),
            embedding_model: "all-minilm".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSearchConfig {
    /// Tried in order, each at most once per query.
    pub providers: Vec<WebSearchBackend>,
    pub max_results: usize,
    pub tavily_api_key: Option<String>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            providers: vec![WebSearchBackend::Tavily, WebSearchBackend::Duckduckgo],
            max_results: 5,
            tavily_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    pub documents_dir: PathBuf,
    pub index_dir: PathBuf,
    pub audit_db: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("./legal_documents"),
            index_dir: PathBuf::from("./nyaya_index"),
            audit_db: PathBuf::from("./nyaya_audit.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Passages must score strictly above this to be used as evidence.
    pub relevance_threshold: f32,
    pub top_k: usize,
    pub request_timeout_secs: u64,
    pub default_language: Language,
    pub language_mismatch: LanguageMismatchPolicy,
    pub ollama: OllamaConfig,
    pub web_search: WebSearchConfig,
    pub paths: PathsConfig,
    pub ingest: IngestConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.5,
            top_k: 3,
            request_timeout_secs: 30,
            default_language: Language::English,
            language_mismatch: LanguageMismatchPolicy::Caveat,
            ollama: OllamaConfig::default(),
            web_search: WebSearchConfig::default(),
            paths: PathsConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(AgentConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("NYAYA_").split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        Self::from_figment(Self::figment(path))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, AppError> {
        let mut cfg: AgentConfig = figment.extract().map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to load configuration")
                .with_details(e.to_string())
        })?;
        if cfg.web_search.tavily_api_key.is_none() {
            cfg.web_search.tavily_api_key = std::env::var("TAVILY_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(AppError::new("CONFIG_INVALID", "relevance_threshold must be within [0, 1]")
                .with_details(format!("relevance_threshold={}", self.relevance_threshold)));
        }
        if self.top_k == 0 {
            return Err(AppError::new("CONFIG_INVALID", "top_k must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "request_timeout_secs must be greater than zero",
            ));
        }
        if self.web_search.providers.is_empty() {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "At least one web search provider is required",
            ));
        }
        if self.web_search.max_results == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "web_search.max_results must be at least 1",
            ));
        }
        if self.ingest.chunk_size == 0 || self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "ingest.chunk_overlap must be smaller than chunk_size",
            )
            .with_details(format!(
                "chunk_size={}; chunk_overlap={}",
                self.ingest.chunk_size, self.ingest.chunk_overlap
            )));
        }
        Ok(())
    }
}
