use std::sync::Arc;
use std::time::Duration;

use nyaya_core::audit::AuditStore;
use nyaya_core::config::AgentConfig;
use nyaya_core::error::AppError;

use crate::embeddings::ollama_embed::OllamaEmbedder;
use crate::embeddings::Embedder;
use crate::index::{DocumentIndex, VectorIndex};
use crate::llm::ollama_llm::OllamaLlm;
use crate::llm::Llm;
use crate::ollama::OllamaClient;
use crate::websearch::WebSearchChain;

/// Process-wide collaborator handles, built once at startup and shared
/// read-only by every query.
pub struct AgentSession {
    config: AgentConfig,
    index: Arc<dyn DocumentIndex>,
    web: WebSearchChain,
    llm: Arc<dyn Llm>,
    audit: Option<AuditStore>,
}

impl AgentSession {
    pub fn new(
        config: AgentConfig,
        index: Arc<dyn DocumentIndex>,
        web: WebSearchChain,
        llm: Arc<dyn Llm>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            config,
            index,
            web,
            llm,
            audit: None,
        })
    }

    pub fn with_audit(mut self, audit: AuditStore) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Wires the Ollama, on-disk index, web search and audit collaborators
    /// described by `config`. An audit database that cannot be opened is
    /// logged and skipped.
    pub fn from_config(config: AgentConfig) -> Result<Self, AppError> {
        let client = ollama_client(&config)?;
        let index = open_vector_index(&config, &client)?;
        let web = WebSearchChain::from_config(&config.web_search, request_timeout(&config));
        let llm: Arc<dyn Llm> = Arc::new(OllamaLlm::new(client));

        let audit = match AuditStore::open(&config.paths.audit_db) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %config.paths.audit_db.display(),
                    "audit log disabled"
                );
                None
            }
        };

        tracing::info!(
            index_dir = %config.paths.index_dir.display(),
            web_search = ?web.provider_names(),
            model = %config.ollama.generation_model,
            "agent session started"
        );
        let mut session = Self::new(config, index, web, llm)?;
        session.audit = audit;
        Ok(session)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn index(&self) -> &dyn DocumentIndex {
        self.index.as_ref()
    }

    pub fn web(&self) -> &WebSearchChain {
        &self.web
    }

    pub fn llm(&self) -> &dyn Llm {
        self.llm.as_ref()
    }

    pub fn audit(&self) -> Option<&AuditStore> {
        self.audit.as_ref()
    }

    /// Explicit teardown at process exit.
    pub fn shutdown(self) {
        tracing::info!("agent session stopped");
    }
}

pub fn request_timeout(config: &AgentConfig) -> Duration {
    Duration::from_secs(config.request_timeout_secs)
}

pub fn ollama_client(config: &AgentConfig) -> Result<OllamaClient, AppError> {
    Ok(OllamaClient::new(&config.ollama.base_url)?.with_timeout(request_timeout(config)))
}

/// Opens the persistent index with an Ollama embedder, for ingestion or
/// querying.
pub fn open_vector_index(
    config: &AgentConfig,
    client: &OllamaClient,
) -> Result<Arc<VectorIndex>, AppError> {
    let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(client.clone()));
    Ok(Arc::new(VectorIndex::open(
        config.paths.index_dir.clone(),
        embedder,
        &config.ollama.embedding_model,
    )?))
}
