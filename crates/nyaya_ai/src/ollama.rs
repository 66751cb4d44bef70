use std::time::Duration;

use nyaya_core::error::AppError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for Ollama. This is strictly limited to `127.0.0.1` or `localhost`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !is_loopback_base_url(&base_url) {
            return Err(AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Ollama base URL must be loopback (127.0.0.1 or localhost)",
            )
            .with_details(format!("base_url={base_url}")));
        }
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
                .with_details(format!("status={}", r.status()))),
            Err(ureq::Error::Status(code, _)) => {
                Err(AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={code}")))
            }
            Err(e) => Err(AppError::new(
                "AI_OLLAMA_UNREACHABLE",
                "Failed to reach Ollama on the loopback interface",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}

fn is_loopback_base_url(base_url: &str) -> bool {
    let Some(rest) = ["http://127.0.0.1", "http://localhost"]
        .iter()
        .find_map(|host| base_url.strip_prefix(host))
    else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    match rest.strip_prefix(':') {
        Some(port) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            matches!(port.parse::<u16>(), Ok(p) if p != 0)
        }
        _ => false,
    }
}
