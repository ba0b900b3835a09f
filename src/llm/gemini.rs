//! Google Gemini `generateContent` client

use super::types::{Turn, WireTurn};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Fully qualified `generateContent` URL, key included.
///
/// Built once at startup so the key is never re-interpolated per call.
/// Neither `Debug` nor `Display` print the key.
#[derive(Clone)]
pub struct GeminiEndpoint {
    url: String,
    api_key: String,
    model: String,
}

impl GeminiEndpoint {
    pub fn new(base_url: &str, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key.unwrap_or_default().to_string();
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            base_url.trim_end_matches('/'),
            model,
            api_key
        );
        Self {
            url,
            api_key,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn secret(&self) -> &str {
        &self.api_key
    }

    fn redacted_url(&self) -> String {
        super::redact_secret(&self.url, &self.api_key)
    }
}

impl fmt::Debug for GeminiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiEndpoint")
            .field("url", &self.redacted_url())
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for GeminiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted_url())
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    endpoint: GeminiEndpoint,
}

impl GeminiService {
    pub fn new(endpoint: GeminiEndpoint, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    async fn send(&self, history: &[Turn]) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: history.iter().map(WireTurn::from).collect(),
        };

        let response = self
            .client
            .post(self.endpoint.url())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors carry the request URL, which carries the key
                let e = e.without_url();
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {}", e.without_url())))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |r| r.error.message);
            return Err(match status.as_u16() {
                400 | 404 => LlmError::invalid_request(format!("HTTP {status}: {message}")),
                401 | 403 => LlmError::auth(format!("HTTP {status}: {message}")),
                429 => LlmError::rate_limit(format!("HTTP {status}: {message}")),
                500..=599 => LlmError::server_error(format!("HTTP {status}: {message}")),
                _ => LlmError::unknown(format!("HTTP {status}: {message}")),
            });
        }

        extract_text(&body)
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, history: &[Turn]) -> Result<String, LlmError> {
        self.send(history)
            .await
            .map_err(|e| e.redact(self.endpoint.secret()))
    }

    fn model_id(&self) -> &str {
        self.endpoint.model()
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a 2xx body.
fn extract_text(body: &str) -> Result<String, LlmError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| LlmError::parse(format!("response is not JSON: {e}")))?;

    let mut cursor = &value;
    let mut path = String::new();
    for step in TEXT_PATH {
        let next = match step {
            PathStep::Key(key) => {
                path.push_str(if path.is_empty() { "" } else { "." });
                path.push_str(key);
                cursor.get(key)
            }
            PathStep::Index(index) => {
                path.push_str(&format!("[{index}]"));
                cursor.get(index)
            }
        };
        cursor = next.ok_or_else(|| LlmError::parse(format!("missing {path}")))?;
    }

    match cursor.as_str() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        Some(_) => Err(LlmError::parse(format!("empty {path}"))),
        None => Err(LlmError::parse(format!("{path} is not a string"))),
    }
}

enum PathStep {
    Key(&'static str),
    Index(usize),
}

const TEXT_PATH: [PathStep; 6] = [
    PathStep::Key("candidates"),
    PathStep::Index(0),
    PathStep::Key("content"),
    PathStep::Key("parts"),
    PathStep::Index(0),
    PathStep::Key("text"),
];

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<WireTurn>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
