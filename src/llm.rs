//! Remote completion client
//!
//! One POST per chat turn carrying the full history; no retry.

mod error;
mod gemini;
mod types;

pub use error::{redact_secret, LlmError, LlmErrorKind};
pub use gemini::{GeminiEndpoint, GeminiService};
pub use types::{Role, Turn};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion backends
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Send the whole history, get the next model turn's text
    async fn complete(&self, history: &[Turn]) -> Result<String, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, history: &[Turn]) -> Result<String, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(history).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_turns = history.len(),
                    reply_chars = text.chars().count(),
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_turns = history.len(),
                    kind = ?e.kind,
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
