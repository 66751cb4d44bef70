use nyaya_core::error::AppError;

/// Stateless text generation: one prompt in, one completion out.
pub trait Llm: Send + Sync {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError>;
}

pub mod ollama_llm;
