//! Request dispatcher
//!
//! Picks the first matching [`Route`], runs its handler, and turns any
//! handler fault into a spoken apology so a session never ends abnormally.

pub mod envelope;
pub mod handlers;

pub use envelope::{Intent, Request, RequestEnvelope, ResponseEnvelope, Session};
pub use handlers::Route;

use crate::config::SkillConfig;
use crate::llm::{GeminiService, LlmError, LlmService, LoggingService};
use crate::session::{Phase, SessionAttributes, SessionError};
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

pub const APOLOGY: &str = "Sorry, I had trouble doing what you asked. Please try again.";

/// Faults raised by turn handlers; every one ends in the fallback reply
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("intent {intent} is missing required slot '{slot}'")]
    MissingSlot { intent: String, slot: &'static str },
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Tunables read from configuration
#[derive(Debug, Clone, Copy)]
pub struct SkillSettings {
    /// Substituted into the priming instruction
    pub max_response_words: u32,
    /// History cap applied after each successful chat turn
    pub max_history_turns: usize,
}

impl Default for SkillSettings {
    fn default() -> Self {
        Self {
            max_response_words: 300,
            max_history_turns: 100,
        }
    }
}

/// What to say back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub speech: Option<String>,
    pub reprompt: Option<String>,
    pub keep_listening: bool,
}

impl Reply {
    /// Speak and keep the microphone open
    pub fn ask(speech: impl Into<String>, reprompt: impl Into<String>) -> Self {
        Self {
            speech: Some(speech.into()),
            reprompt: Some(reprompt.into()),
            keep_listening: true,
        }
    }

    /// Speak and end the session
    pub fn tell(speech: impl Into<String>) -> Self {
        Self {
            speech: Some(speech.into()),
            reprompt: None,
            keep_listening: false,
        }
    }

    /// End the session without speaking
    pub fn silent() -> Self {
        Self {
            speech: None,
            reprompt: None,
            keep_listening: false,
        }
    }
}

/// Result of one turn: the reply plus the attributes to persist
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: Reply,
    pub attributes: SessionAttributes,
}

impl TurnOutcome {
    /// The fallback answer, carrying `attributes` back untouched
    pub fn apology(attributes: SessionAttributes) -> Self {
        Self {
            reply: Reply::ask(APOLOGY, APOLOGY),
            attributes,
        }
    }

    pub fn into_envelope(self) -> ResponseEnvelope {
        ResponseEnvelope::new(
            self.reply.speech.as_deref(),
            self.reply.reprompt.as_deref(),
            self.reply.keep_listening,
            self.attributes,
        )
    }
}

/// The skill entry point. Immutable; share it behind an `Arc`.
pub struct Skill {
    llm: Arc<dyn LlmService>,
    settings: SkillSettings,
}

impl Skill {
    pub fn new(llm: Arc<dyn LlmService>, settings: SkillSettings) -> Self {
        Self { llm, settings }
    }

    /// Production wiring: Gemini behind the logging wrapper
    pub fn from_config(config: &SkillConfig) -> Result<Self, LlmError> {
        let gemini = GeminiService::new(config.endpoint.clone(), config.timeout)?;
        let llm = Arc::new(LoggingService::new(Arc::new(gemini)));
        Ok(Self::new(llm, config.settings))
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Handle one inbound envelope
    pub async fn handle(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let Session {
            session_id,
            attributes,
            ..
        } = envelope.session.unwrap_or_default();

        let span = tracing::info_span!(
            "turn",
            session_id = %session_id,
            request = envelope.request.kind(),
            phase = phase_name(&attributes)
        );
        async {
            let outcome = self.respond(&envelope.request, attributes).await;
            tracing::debug!(
                phase = phase_name(&outcome.attributes),
                keep_listening = outcome.reply.keep_listening,
                "Turn complete"
            );
            outcome.into_envelope()
        }
        .instrument(span)
        .await
    }

    /// Dispatch a request against the given attributes.
    ///
    /// On a handler fault the incoming attributes are returned unchanged.
    pub async fn respond(&self, request: &Request, attributes: SessionAttributes) -> TurnOutcome {
        let route = Route::select(request);
        tracing::debug!(route = route.name(), "Dispatching");

        match self.dispatch(route, request, attributes.clone()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    route = route.name(),
                    error = %e,
                    detail = ?e,
                    "Turn handler failed, answering with apology"
                );
                TurnOutcome::apology(attributes)
            }
        }
    }

    async fn dispatch(
        &self,
        route: Route,
        request: &Request,
        attributes: SessionAttributes,
    ) -> Result<TurnOutcome, SkillError> {
        match (route, request) {
            (Route::Launch, _) => handlers::launch(&self.settings, attributes),
            (Route::Chat, Request::Intent { intent, .. }) => {
                handlers::chat(self.llm.as_ref(), &self.settings, intent, attributes).await
            }
            (Route::Stop, _) => Ok(handlers::stop(attributes)),
            (Route::SessionEnded, _) => Ok(handlers::session_ended(request, attributes)),
            (Route::Chat | Route::Unrecognized, _) => {
                Ok(handlers::unrecognized(request, attributes))
            }
        }
    }
}

fn phase_name(attributes: &SessionAttributes) -> &'static str {
    attributes.phase().map_or("malformed", Phase::as_str)
}
