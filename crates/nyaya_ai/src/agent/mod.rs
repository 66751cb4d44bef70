//! The orchestrator: one query in, one grounded answer (or a classified
//! failure) out.
//!
//! A query moves linearly through `Start -> Retrieved -> Grounded -> Done`;
//! any step may instead end in `Failed`. The Answer Generator is called
//! exactly once per query.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nyaya_core::audit::QueryAuditEntry;
use nyaya_core::config::LanguageMismatchPolicy;
use nyaya_core::domain::{AnswerRecord, Language, Query, RetrievalResult};

use crate::error::AgentError;
use crate::fallback::{Evidence, FallbackController};
use crate::guardrails::{answer_language_ok, reject_template_tokens};
use crate::prompts::build_prompt;
use crate::retrieve::retrieve;

pub mod session;

pub use session::AgentSession;

/// Cooperative cancellation, checked between stages. A request already in
/// flight is allowed to finish; its result is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum QueryState {
    Start,
    Retrieved(RetrievalResult),
    Grounded(Evidence),
    Done(AnswerRecord),
    Failed(AgentError),
}

#[derive(Clone)]
pub struct Orchestrator {
    session: Arc<AgentSession>,
}

impl Orchestrator {
    pub fn new(session: Arc<AgentSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &AgentSession {
        &self.session
    }

    pub fn answer(
        &self,
        query_text: &str,
        language: Language,
        taluk: Option<&str>,
    ) -> Result<AnswerRecord, AgentError> {
        self.answer_with_cancel(query_text, language, taluk, &CancelToken::new())
    }

    pub fn answer_with_cancel(
        &self,
        query_text: &str,
        language: Language,
        taluk: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<AnswerRecord, AgentError> {
        let query = Query::new(query_text, language, taluk).map_err(AgentError::InvalidQuery)?;
        self.answer_query(&query, cancel)
    }

    pub fn answer_query(
        &self,
        query: &Query,
        cancel: &CancelToken,
    ) -> Result<AnswerRecord, AgentError> {
        let span = tracing::info_span!("answer", query_id = %query.id());
        let _entered = span.enter();
        tracing::info!(
            query = %query.text(),
            language = %query.language(),
            taluk = ?query.region_filter().map(|r| r.taluk.as_str()),
            "query received"
        );

        let cfg = self.session.config();
        let controller = FallbackController::new(cfg.relevance_threshold, self.session.web());
        let mut scores: Vec<f32> = Vec::new();

        let mut state = match reject_template_tokens(query.text()) {
            Ok(()) => QueryState::Start,
            Err(e) => QueryState::Failed(AgentError::InvalidQuery(e)),
        };
        let outcome = loop {
            state = match state {
                QueryState::Done(record) => break Ok(record),
                QueryState::Failed(err) => break Err(err),
                _ if cancel.is_cancelled() => QueryState::Failed(AgentError::Cancelled),
                QueryState::Start => {
                    let region = query.region_filter();
                    match retrieve(self.session.index(), query.text(), cfg.top_k, region) {
                        Ok(result) => {
                            scores = result.scores();
                            tracing::info!(scores = ?scores, "retrieved");
                            QueryState::Retrieved(result)
                        }
                        Err(e) => QueryState::Failed(e),
                    }
                }
                QueryState::Retrieved(result) => {
                    match controller.select_evidence(&result, query.text()) {
                        Ok(evidence) => {
                            let backend = match &evidence {
                                Evidence::Web(hit) => Some(hit.backend.as_str()),
                                Evidence::Index { .. } => None,
                            };
                            tracing::info!(
                                provenance = %evidence.provenance(),
                                backend = ?backend,
                                sources = ?evidence.sources(),
                                "evidence selected"
                            );
                            QueryState::Grounded(evidence)
                        }
                        Err(e) => QueryState::Failed(e),
                    }
                }
                QueryState::Grounded(evidence) => match self.generate(query, &evidence) {
                    Ok(record) => QueryState::Done(record),
                    Err(e) => QueryState::Failed(e),
                },
            };
        };

        match &outcome {
            Ok(record) => tracing::info!(
                provenance = %record.provenance,
                language_caveat = record.language_caveat,
                "answered"
            ),
            Err(e) => tracing::warn!(code = e.code(), error = %e, "query failed"),
        }
        self.record_audit(query, scores, &outcome);
        outcome
    }

    fn generate(&self, query: &Query, evidence: &Evidence) -> Result<AnswerRecord, AgentError> {
        let cfg = self.session.config();
        let prompt = build_prompt(&evidence.context_text(), query.text(), query.language())?;
        let answer_text = self
            .session
            .llm()
            .generate(&cfg.ollama.generation_model, &prompt)
            .map_err(AgentError::GenerationFailure)?;

        let language_ok = answer_language_ok(&answer_text, query.language(), cfg.default_language);
        if !language_ok {
            match cfg.language_mismatch {
                LanguageMismatchPolicy::Reject => {
                    return Err(AgentError::LanguageMismatch {
                        expected: query.language(),
                        answer: answer_text,
                    });
                }
                LanguageMismatchPolicy::Caveat => {
                    tracing::warn!(
                        expected = %query.language(),
                        "answer language could not be confirmed"
                    );
                }
            }
        }

        Ok(AnswerRecord {
            query_id: query.id().to_string(),
            answer_text,
            sources: evidence.sources(),
            provenance: evidence.provenance(),
            language: query.language(),
            language_caveat: !language_ok,
        })
    }

    /// Advisory: failures are logged and never affect the query outcome.
    fn record_audit(
        &self,
        query: &Query,
        scores: Vec<f32>,
        outcome: &Result<AnswerRecord, AgentError>,
    ) {
        let Some(audit) = self.session.audit() else {
            return;
        };
        let entry = QueryAuditEntry {
            query_id: query.id().to_string(),
            query_text: query.text().to_string(),
            language: query.language(),
            taluk: query.region_filter().map(|r| r.taluk.clone()),
            scores,
            provenance: outcome.as_ref().ok().map(|r| r.provenance),
            sources: outcome.as_ref().map(|r| r.sources.clone()).unwrap_or_default(),
            error_code: outcome.as_ref().err().map(|e| e.code().to_string()),
        };
        if let Err(e) = audit.record_query(&entry) {
            tracing::warn!(error = %e, "failed to record query audit entry");
        }
    }
}
