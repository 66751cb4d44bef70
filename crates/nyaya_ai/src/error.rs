//! Failure taxonomy returned by the orchestrator.

use nyaya_core::domain::Language;
use nyaya_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchFailureKind {
    /// Missing credential or other configuration; the provider was not called.
    #[error("not configured")]
    Unconfigured,
    /// Unreachable, timed out, or refused.
    #[error("transport error")]
    Transport,
    #[error("bad response")]
    BadResponse,
    #[error("no results")]
    NoResults,
}

/// One provider's failed attempt within a web-search chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider}: {kind}: {detail}")]
pub struct SearchFailure {
    pub provider: String,
    pub kind: SearchFailureKind,
    pub detail: String,
}

impl SearchFailure {
    pub fn new(
        provider: impl Into<String>,
        kind: SearchFailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid query: {0}")]
    InvalidQuery(AppError),

    #[error("document index unavailable: {0}")]
    IndexUnavailable(AppError),

    #[error("web search unavailable ({})", summarize(.attempts))]
    SearchUnavailable { attempts: Vec<SearchFailure> },

    #[error("answer generation failed: {0}")]
    GenerationFailure(AppError),

    #[error("generated answer is not in {expected}")]
    LanguageMismatch { expected: Language, answer: String },

    #[error("query cancelled")]
    Cancelled,
}

fn summarize(attempts: &[SearchFailure]) -> String {
    if attempts.is_empty() {
        return "no providers configured".to_string();
    }
    attempts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl AgentError {
    /// Stable code the presentation layer can localise.
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::InvalidQuery(_) => "QUERY_INVALID",
            AgentError::IndexUnavailable(_) => "INDEX_UNAVAILABLE",
            AgentError::SearchUnavailable { .. } => "SEARCH_UNAVAILABLE",
            AgentError::GenerationFailure(_) => "GENERATION_FAILED",
            AgentError::LanguageMismatch { .. } => "LANGUAGE_MISMATCH",
            AgentError::Cancelled => "QUERY_CANCELLED",
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            AgentError::IndexUnavailable(e) | AgentError::GenerationFailure(e) => e.retryable,
            AgentError::SearchUnavailable { attempts } => {
                attempts.iter().any(|a| a.kind == SearchFailureKind::Transport)
            }
            AgentError::InvalidQuery(_)
            | AgentError::LanguageMismatch { .. }
            | AgentError::Cancelled => false,
        }
    }
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        let code = err.code();
        let retryable = err.retryable();
        let out = match &err {
            AgentError::InvalidQuery(e) => AppError::new(code, e.message.clone()),
            AgentError::IndexUnavailable(_) => {
                AppError::new(code, "Legal document index is not available")
            }
            AgentError::SearchUnavailable { .. } => AppError::new(
                code,
                "No relevant documents were found and web search is unavailable",
            ),
            AgentError::GenerationFailure(_) => {
                AppError::new(code, "The answer could not be generated")
            }
            AgentError::LanguageMismatch { expected, .. } => {
                AppError::new(code, format!("The answer could not be produced in {expected}"))
            }
            AgentError::Cancelled => AppError::new(code, "The query was cancelled"),
        };
        out.with_details(err.to_string()).with_retryable(retryable)
    }
}
