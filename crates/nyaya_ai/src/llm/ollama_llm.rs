use nyaya_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Llm;
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
}

impl OllamaLlm {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Llm for OllamaLlm {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.client.base_url());
        let req = GenerateRequest {
            model,
            prompt,
            stream: false,
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("AI_GENERATE_FAILED", "Failed to encode generate request")
                .with_details(e.to_string())
        })?;

        let resp = ureq::post(&url).timeout(self.client.timeout()).send_json(body);

        match resp {
            Ok(r) => {
                let v: GenerateResponse = r.into_json().map_err(|e| {
                    AppError::new("AI_GENERATE_FAILED", "Failed to decode generate response")
                        .with_details(e.to_string())
                })?;
                if v.response.trim().is_empty() {
                    return Err(AppError::new("AI_GENERATE_FAILED", "Generate response was empty"));
                }
                Ok(v.response)
            }
            Err(ureq::Error::Status(code, _)) => {
                Err(AppError::new("AI_GENERATE_FAILED", "Generate request failed")
                    .with_details(format!("status={code}; model={model}")))
            }
            Err(e) => Err(AppError::new("AI_GENERATE_FAILED", "Failed to call generate endpoint")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }
}
