use nyaya_core::error::AppError;

/// Maps text to a fixed-length vector. Shared across concurrent queries.
pub trait Embedder: Send + Sync {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod ollama_embed;
