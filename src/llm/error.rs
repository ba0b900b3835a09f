//! LLM error types

use thiserror::Error;

/// Placeholder substituted for the API key in any error text
pub const REDACTED_KEY: &str = "API_KEY_HIDDEN";

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Parse, format!("Parsing Error: {}", message.into()))
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Replace every occurrence of `secret` in the message.
    #[must_use]
    pub fn redact(mut self, secret: &str) -> Self {
        self.message = redact_secret(&self.message, secret);
        self
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400, 404)
    InvalidRequest,
    /// 2xx reply that does not carry `candidates[0].content.parts[0].text`
    Parse,
    /// Unknown error
    Unknown,
}

impl LlmErrorKind {
    /// Whether a later attempt could succeed. Nothing retries today; the
    /// classification is logged so operators can tell outages from bad keys.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

/// Replace `secret` with [`REDACTED_KEY`] wherever it appears in `text`.
///
/// An empty secret leaves the text alone. A secret that would still show up
/// after substitution (it overlaps the placeholder) is deleted instead.
pub fn redact_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    let redacted = text.replace(secret, REDACTED_KEY);
    if !redacted.contains(secret) {
        return redacted;
    }

    // Each pass shortens the text, so this terminates
    let mut stripped = text.to_string();
    while stripped.contains(secret) {
        stripped = stripped.replace(secret, "");
    }
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_errors_are_prefixed() {
        let err = LlmError::parse("missing candidates");
        assert_eq!(err.kind, LlmErrorKind::Parse);
        assert_eq!(err.to_string(), "Parsing Error: missing candidates");
        assert!(!err.kind.is_retryable());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(LlmErrorKind::Network.is_retryable());
        assert!(LlmErrorKind::ServerError.is_retryable());
        assert!(!LlmErrorKind::Auth.is_retryable());
        assert!(!LlmErrorKind::Parse.is_retryable());
    }

    #[test]
    fn test_redact_replaces_every_occurrence() {
        let err = LlmError::network("GET /x?key=abc123 failed; retry /y?key=abc123").redact("abc123");
        assert_eq!(
            err.message,
            "GET /x?key=API_KEY_HIDDEN failed; retry /y?key=API_KEY_HIDDEN"
        );
    }

    #[test]
    fn test_secret_inside_placeholder_is_removed() {
        let redacted = redact_secret("HTTP 403: key=KEY rejected", "KEY");
        assert!(!redacted.contains("KEY"));
        assert_eq!(redacted, "HTTP 403: key= rejected");

        // Deleting one occurrence can join its neighbours into another
        assert_eq!(redact_secret("KKEYEY", "KEY"), "");
    }

    #[test]
    fn test_empty_secret_is_a_no_op() {
        assert_eq!(redact_secret("nothing to hide", ""), "nothing to hide");
    }

    proptest! {
        #[test]
        fn prop_secret_never_survives_redaction(
            prefix in "[ -~]{0,40}",
            suffix in "[ -~]{0,40}",
            secret in "[ -~]{1,40}",
        ) {
            let message = format!("{prefix}{secret}{suffix}?key={secret}");
            let redacted = redact_secret(&message, &secret);
            prop_assert!(!redacted.contains(&secret));
        }
    }
}
