//! Retrieval gate: region-aware similarity search over the document index.

use std::collections::HashSet;

use nyaya_core::domain::{RegionFilter, RetrievalResult, ScoredPassage};
use nyaya_core::error::AppError;

use crate::error::AgentError;
use crate::index::{DocumentIndex, MetadataFilter};

/// Returns at most `top_k` passages, best first.
///
/// With a region filter, the search is restricted to passages tagged with that
/// taluk. When no passage carries the tag the result is empty; the search is
/// never widened to the whole index. Index failures are reported as
/// `IndexUnavailable`, never as an empty result.
pub fn retrieve(
    index: &dyn DocumentIndex,
    query_text: &str,
    top_k: usize,
    region: Option<&RegionFilter>,
) -> Result<RetrievalResult, AgentError> {
    if top_k == 0 {
        return Err(AgentError::InvalidQuery(AppError::new(
            "QUERY_INVALID",
            "top_k must be at least 1",
        )));
    }

    let restrict: Option<HashSet<String>> = match region {
        Some(r) => {
            let ids = index
                .ids_by_metadata(&MetadataFilter::taluk(r.taluk.clone()))
                .map_err(AgentError::IndexUnavailable)?;
            if ids.is_empty() {
                tracing::info!(taluk = %r.taluk, "no passages tagged with taluk");
                return Ok(RetrievalResult::empty());
            }
            Some(ids.into_iter().collect())
        }
        None => None,
    };

    let hits = index
        .similarity_search(query_text, top_k, restrict.as_ref())
        .map_err(AgentError::IndexUnavailable)?;

    let hits: Vec<ScoredPassage> = hits
        .into_iter()
        .filter(|h| restrict.as_ref().map_or(true, |ids| ids.contains(&h.passage.id)))
        .take(top_k)
        .map(|mut h| {
            h.score = if h.score.is_nan() { 0.0 } else { h.score.clamp(0.0, 1.0) };
            h
        })
        .collect();
    Ok(RetrievalResult::from_hits(hits))
}
