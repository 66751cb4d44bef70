#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nyaya_ai::agent::{AgentSession, Orchestrator};
use nyaya_ai::embeddings::Embedder;
use nyaya_ai::error::{SearchFailure, SearchFailureKind};
use nyaya_ai::index::{DocumentIndex, MetadataFilter};
use nyaya_ai::llm::Llm;
use nyaya_ai::websearch::{WebSearchChain, WebSearchProvider};
use nyaya_core::config::AgentConfig;
use nyaya_core::domain::{Language, Passage, RegionMetadata, ScoredPassage};
use nyaya_core::error::AppError;

pub fn passage(id: &str, source: &str, taluk: &str) -> Passage {
    Passage {
        id: id.to_string(),
        content: format!("content of {id}"),
        source: source.to_string(),
        language: Language::English,
        region: RegionMetadata {
            taluk: taluk.to_string(),
            pincode: "570001".to_string(),
        },
    }
}

pub fn scored(id: &str, source: &str, score: f32) -> ScoredPassage {
    ScoredPassage {
        passage: passage(id, source, "Mysuru"),
        score,
    }
}

/// Index returning a fixed candidate list (already in index order).
pub struct FixedIndex {
    pub hits: Vec<ScoredPassage>,
    pub available: bool,
    pub search_calls: AtomicUsize,
    pub last_restrict: Mutex<Option<HashSet<String>>>,
}

impl FixedIndex {
    pub fn new(hits: Vec<ScoredPassage>) -> Self {
        Self {
            hits,
            available: true,
            search_calls: AtomicUsize::new(0),
            last_restrict: Mutex::new(None),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

impl DocumentIndex for FixedIndex {
    fn similarity_search(
        &self,
        _query_text: &str,
        k: usize,
        restrict_to: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredPassage>, AppError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(AppError::new("INDEX_UNAVAILABLE", "Index not ready"));
        }
        *self.last_restrict.lock().unwrap() = restrict_to.cloned();
        Ok(self
            .hits
            .iter()
            .filter(|h| restrict_to.map_or(true, |ids| ids.contains(&h.passage.id)))
            .take(k)
            .cloned()
            .collect())
    }

    fn ids_by_metadata(&self, filter: &MetadataFilter) -> Result<Vec<String>, AppError> {
        if !self.available {
            return Err(AppError::new("INDEX_UNAVAILABLE", "Index not ready"));
        }
        Ok(self
            .hits
            .iter()
            .filter(|h| filter.matches(&h.passage))
            .map(|h| h.passage.id.clone())
            .collect())
    }
}

/// Web-search backend with a scripted outcome and a call counter.
pub struct ScriptedSearch {
    pub name: &'static str,
    pub outcome: Result<String, SearchFailureKind>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedSearch {
    pub fn ok(name: &'static str, text: &str) -> (Self, Arc<AtomicUsize>) {
        Self::with(name, Ok(text.to_string()))
    }

    pub fn failing(name: &'static str, kind: SearchFailureKind) -> (Self, Arc<AtomicUsize>) {
        Self::with(name, Err(kind))
    }

    fn with(
        name: &'static str,
        outcome: Result<String, SearchFailureKind>,
    ) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                outcome,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl WebSearchProvider for ScriptedSearch {
    fn name(&self) -> &str {
        self.name
    }

    fn search(&self, _query: &str) -> Result<String, SearchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .map_err(|kind| SearchFailure::new(self.name, kind, "scripted failure"))
    }
}

pub struct WebFixture {
    pub chain: WebSearchChain,
    pub primary_calls: Arc<AtomicUsize>,
    pub secondary_calls: Arc<AtomicUsize>,
}

pub fn web(primary: ScriptedSearch, secondary: ScriptedSearch) -> WebFixture {
    let primary_calls = primary.calls.clone();
    let secondary_calls = secondary.calls.clone();
    WebFixture {
        chain: WebSearchChain::new(vec![Box::new(primary), Box::new(secondary)]),
        primary_calls,
        secondary_calls,
    }
}

pub fn working_web() -> WebFixture {
    let (p, _) = ScriptedSearch::ok("tavily", "[https://land.example]: Karnataka Land Revenue Act");
    let (s, _) = ScriptedSearch::ok("duckduckgo", "Karnataka land laws");
    web(p, s)
}

/// Generator returning a fixed reply and recording every prompt it sees.
pub struct RecordingLlm {
    pub reply: Result<String, AppError>,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(
                AppError::new("AI_GENERATE_FAILED", "Failed to call generate endpoint")
                    .with_retryable(true),
            ),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Llm for RecordingLlm {
    fn generate(&self, _model: &str, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

/// Two-dimensional embedding counting the letters 'a' and 'b'.
pub struct CountABEmbedder;

impl Embedder for CountABEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let a = input.chars().filter(|c| *c == 'a').count();
        let b = input.chars().filter(|c| *c == 'b').count();
        Ok(vec![a as f32, b as f32])
    }
}

pub fn orchestrator(
    config: AgentConfig,
    index: Arc<dyn DocumentIndex>,
    chain: WebSearchChain,
    llm: Arc<dyn Llm>,
) -> Orchestrator {
    let session = AgentSession::new(config, index, chain, llm).expect("session");
    Orchestrator::new(Arc::new(session))
}
