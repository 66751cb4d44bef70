//! Live web search used when the local index has no relevant evidence.

use std::time::Duration;

use nyaya_core::config::{WebSearchBackend, WebSearchConfig};

use crate::error::{AgentError, SearchFailure, SearchFailureKind};

pub mod duckduckgo;
pub mod tavily;

pub use duckduckgo::DuckDuckGoSearch;
pub use tavily::TavilySearch;

pub trait WebSearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the rendered result text for `query`.
    fn search(&self, query: &str) -> Result<String, SearchFailure>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchHit {
    pub backend: String,
    pub text: String,
}

/// Providers tried in order, each at most once per query.
pub struct WebSearchChain {
    providers: Vec<Box<dyn WebSearchProvider>>,
}

impl WebSearchChain {
    pub fn new(providers: Vec<Box<dyn WebSearchProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(cfg: &WebSearchConfig, timeout: Duration) -> Self {
        let providers = cfg
            .providers
            .iter()
            .map(|backend| -> Box<dyn WebSearchProvider> {
                match backend {
                    WebSearchBackend::Tavily => Box::new(TavilySearch::new(
                        cfg.tavily_api_key.clone(),
                        cfg.max_results,
                        timeout,
                    )),
                    WebSearchBackend::Duckduckgo => {
                        Box::new(DuckDuckGoSearch::new(cfg.max_results, timeout))
                    }
                }
            })
            .collect();
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// First non-empty result wins. An empty result counts as a failure so
    /// that an answer is never grounded in nothing.
    pub fn search(&self, query: &str) -> Result<WebSearchHit, AgentError> {
        let mut attempts = Vec::new();
        for provider in self.providers.iter() {
            match provider.search(query) {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!(
                        backend = provider.name(),
                        failed_before = attempts.len(),
                        "web search succeeded"
                    );
                    return Ok(WebSearchHit {
                        backend: provider.name().to_string(),
                        text,
                    });
                }
                Ok(_) => {
                    let failure = SearchFailure::new(
                        provider.name(),
                        SearchFailureKind::NoResults,
                        "empty result",
                    );
                    tracing::warn!(
                        backend = provider.name(),
                        error = %failure,
                        "web search returned nothing"
                    );
                    attempts.push(failure);
                }
                Err(failure) => {
                    tracing::warn!(
                        backend = provider.name(),
                        error = %failure,
                        "web search provider failed"
                    );
                    attempts.push(failure);
                }
            }
        }
        Err(AgentError::SearchUnavailable { attempts })
    }
}
