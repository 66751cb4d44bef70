use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::WebSearchProvider;
use crate::error::{SearchFailure, SearchFailureKind};

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const NAME: &str = "tavily";

/// Primary backend. Requires an API credential.
#[derive(Debug, Clone)]
pub struct TavilySearch {
    api_key: Option<String>,
    max_results: usize,
    timeout: Duration,
}

impl TavilySearch {
    pub fn new(api_key: Option<String>, max_results: usize, timeout: Duration) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_results,
            timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    url: String,
    #[serde(default)]
    content: String,
}

fn render_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("[{}]: {}", r.url, r.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl WebSearchProvider for TavilySearch {
    fn name(&self) -> &str {
        NAME
    }

    fn search(&self, query: &str) -> Result<String, SearchFailure> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            SearchFailure::new(NAME, SearchFailureKind::Unconfigured, "TAVILY_API_KEY is not set")
        })?;

        let body = serde_json::to_value(SearchRequest {
            query,
            max_results: self.max_results,
        })
        .map_err(|e| SearchFailure::new(NAME, SearchFailureKind::BadResponse, e.to_string()))?;

        let resp = ureq::post(TAVILY_ENDPOINT)
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_json(body);

        match resp {
            Ok(r) => {
                let v: SearchResponse = r
                    .into_json()
                    .map_err(|e| {
                        SearchFailure::new(NAME, SearchFailureKind::BadResponse, e.to_string())
                    })?;
                Ok(render_results(&v.results))
            }
            Err(ureq::Error::Status(code @ (401 | 403), _)) => Err(SearchFailure::new(
                NAME,
                SearchFailureKind::Unconfigured,
                format!("credential rejected: status={code}"),
            )),
            Err(ureq::Error::Status(code, _)) => Err(SearchFailure::new(
                NAME,
                SearchFailureKind::BadResponse,
                format!("status={code}"),
            )),
            Err(e) => Err(SearchFailure::new(NAME, SearchFailureKind::Transport, e.to_string())),
        }
    }
}
