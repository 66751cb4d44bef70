//! Command handlers. Each returns a serializable payload that `main` prints
//! as JSON, or a structured error.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use nyaya_ai::agent::session::{ollama_client, open_vector_index, request_timeout};
use nyaya_ai::agent::{AgentSession, Orchestrator};
use nyaya_ai::index::store::IngestSummary;
use nyaya_ai::index::{IndexStatus, VectorIndex};
use nyaya_ai::websearch::WebSearchChain;
use nyaya_core::audit::AuditStore;
use nyaya_core::config::AgentConfig;
use nyaya_core::domain::{AnswerRecord, Language};
use nyaya_core::error::AppError;
use nyaya_core::ingest::{load_documents, RegionTags};

#[derive(Debug, serde::Serialize)]
pub struct IngestResponse {
    pub documents_dir: String,
    pub passages: usize,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

#[derive(Debug, serde::Serialize)]
pub struct OllamaHealth {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub git_commit: Option<&'static str>,
    pub index_dir: String,
    pub index: IndexStatus,
    pub ollama: OllamaHealth,
    pub web_search: Vec<String>,
    pub relevance_threshold: f32,
    pub top_k: usize,
    pub default_language: Language,
}

#[derive(Debug, serde::Serialize)]
pub struct FeedbackResponse {
    pub ok: bool,
    pub query_id: String,
    pub rating: u8,
}

#[derive(Debug, serde::Serialize)]
pub struct ExportResponse {
    pub path: String,
    pub rows: usize,
}

pub fn ingest(
    config: &AgentConfig,
    dir: Option<PathBuf>,
    taluk: Option<String>,
    pincode: Option<String>,
) -> Result<IngestResponse, AppError> {
    let dir = dir.unwrap_or_else(|| config.paths.documents_dir.clone());
    let tags = RegionTags { taluk, pincode };
    let passages = load_documents(&dir, &tags, &config.ingest)?;
    if passages.is_empty() {
        return Err(AppError::new("INGEST_SOURCE_EMPTY", "No .txt or .md documents found")
            .with_details(format!("path={}", dir.display())));
    }
    tracing::info!(dir = %dir.display(), passages = passages.len(), "loaded documents");

    let index = open_index(config)?;
    let summary = index.ingest(&passages)?;
    Ok(IngestResponse {
        documents_dir: dir.display().to_string(),
        passages: passages.len(),
        summary,
    })
}

pub fn ask(
    config: AgentConfig,
    question: &str,
    language: Option<&str>,
    taluk: Option<&str>,
) -> Result<AnswerRecord, AppError> {
    let language = match language {
        Some(l) => Language::from_str(l)?,
        None => config.default_language,
    };
    let session = Arc::new(AgentSession::from_config(config)?);
    let orchestrator = Orchestrator::new(Arc::clone(&session));
    let outcome = orchestrator.answer(question, language, taluk);
    drop(orchestrator);
    if let Ok(session) = Arc::try_unwrap(session) {
        session.shutdown();
    }
    Ok(outcome?)
}

pub fn status(config: &AgentConfig) -> Result<StatusResponse, AppError> {
    let index = open_index(config)?;
    let ollama = match ollama_client(config).and_then(|c| c.health_check()) {
        Ok(()) => OllamaHealth {
            ok: true,
            message: format!("Ollama reachable at {}", config.ollama.base_url),
        },
        Err(e) => OllamaHealth {
            ok: false,
            message: e.to_string(),
        },
    };
    let web = WebSearchChain::from_config(&config.web_search, request_timeout(config));

    Ok(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        git_commit: option_env!("GIT_COMMIT_HASH"),
        index_dir: config.paths.index_dir.display().to_string(),
        index: index.status()?,
        ollama,
        web_search: web.provider_names().into_iter().map(str::to_string).collect(),
        relevance_threshold: config.relevance_threshold,
        top_k: config.top_k,
        default_language: config.default_language,
    })
}

pub fn feedback(
    config: &AgentConfig,
    query_id: &str,
    rating: u8,
) -> Result<FeedbackResponse, AppError> {
    let audit = AuditStore::open(&config.paths.audit_db)?;
    audit.record_feedback(query_id, rating)?;
    Ok(FeedbackResponse {
        ok: true,
        query_id: query_id.to_string(),
        rating,
    })
}

pub fn export_feedback(config: &AgentConfig, path: &Path) -> Result<ExportResponse, AppError> {
    let audit = AuditStore::open(&config.paths.audit_db)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new("FEEDBACK_EXPORT_FAILED", "Failed to create export directory")
                .with_details(format!("path={}; err={}", parent.display(), e))
        })?;
    }
    let file = fs::File::create(path).map_err(|e| {
        AppError::new("FEEDBACK_EXPORT_FAILED", "Failed to create export file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let rows = audit.export_feedback_csv(file)?;
    Ok(ExportResponse {
        path: path.display().to_string(),
        rows,
    })
}

fn open_index(config: &AgentConfig) -> Result<Arc<VectorIndex>, AppError> {
    let client = ollama_client(config)?;
    open_vector_index(config, &client)
}
