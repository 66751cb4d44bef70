//! Fallback controller: decides whether retrieved passages are good enough to
//! answer from, and otherwise turns to web search.

use nyaya_core::domain::{Provenance, RetrievalResult, ScoredPassage, WEB_SOURCE_MARKER};

use crate::error::AgentError;
use crate::websearch::{WebSearchChain, WebSearchHit};

/// The material an answer is grounded in. Drawn from the index or from the
/// web, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    Index { passages: Vec<ScoredPassage> },
    Web(WebSearchHit),
}

impl Evidence {
    pub fn provenance(&self) -> Provenance {
        match self {
            Evidence::Index { .. } => Provenance::Index,
            Evidence::Web(_) => Provenance::Web,
        }
    }

    /// Text handed to the prompt assembler. Index passages are tagged with
    /// their source, best first.
    pub fn context_text(&self) -> String {
        match self {
            Evidence::Index { passages } => passages
                .iter()
                .map(|p| format!("[source: {}]\n{}", p.passage.source, p.passage.content))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Evidence::Web(hit) => hit.text.clone(),
        }
    }

    /// Distinct source identifiers in evidence order, or the web marker.
    pub fn sources(&self) -> Vec<String> {
        match self {
            Evidence::Index { passages } => {
                let mut out: Vec<String> = Vec::new();
                for p in passages {
                    if !out.iter().any(|s| s == &p.passage.source) {
                        out.push(p.passage.source.clone());
                    }
                }
                out
            }
            Evidence::Web(_) => vec![WEB_SOURCE_MARKER.to_string()],
        }
    }
}

pub struct FallbackController<'a> {
    threshold: f32,
    web: &'a WebSearchChain,
}

impl<'a> FallbackController<'a> {
    pub fn new(threshold: f32, web: &'a WebSearchChain) -> Self {
        Self { threshold, web }
    }

    /// Passages scoring strictly above the threshold, in descending-score
    /// order with ties kept in retrieval order.
    pub fn relevant(&self, result: &RetrievalResult) -> Vec<ScoredPassage> {
        let mut relevant: Vec<ScoredPassage> = result
            .hits()
            .iter()
            .filter(|h| h.score > self.threshold)
            .cloned()
            .collect();
        relevant.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        relevant
    }

    pub fn select_evidence(
        &self,
        result: &RetrievalResult,
        query_text: &str,
    ) -> Result<Evidence, AgentError> {
        let relevant = self.relevant(result);
        if !relevant.is_empty() {
            tracing::debug!(
                relevant = relevant.len(),
                threshold = self.threshold,
                "answering from index"
            );
            return Ok(Evidence::Index { passages: relevant });
        }
        tracing::info!(
            retrieved = result.len(),
            threshold = self.threshold,
            "no relevant passages; falling back to web search"
        );
        Ok(Evidence::Web(self.web.search(query_text)?))
    }
}
