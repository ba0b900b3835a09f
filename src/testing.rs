//! Mock implementations for testing
//!
//! These mocks let the skill run end to end without network I/O.

use crate::llm::{LlmError, LlmService, Turn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    model_id: String,
    /// Record of every history sent
    pub requests: Mutex<Vec<Vec<Turn>>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_response(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue an error
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, history: &[Turn]) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(history.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
