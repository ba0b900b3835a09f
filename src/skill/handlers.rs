//! Turn handlers
//!
//! Each handler takes the session attributes by value and hands back the
//! (possibly updated) attributes with the reply. Nothing outlives the call.

use super::envelope::{Intent, Request};
use super::{Reply, SkillError, SkillSettings, TurnOutcome};
use crate::llm::{LlmService, Turn};
use crate::session::{History, SessionAttributes};

pub const CHAT_INTENT: &str = "ChatIntent";
pub const QUERY_SLOT: &str = "query";
pub const STOP_INTENTS: [&str; 2] = ["AMAZON.StopIntent", "AMAZON.CancelIntent"];

pub const WELCOME: &str = "I am google gemini, How can I help you?";
pub const CHAT_REPROMPT: &str = "Any other questions?";
pub const NO_RESPONSE: &str = "I did not receive a response. Debug Error:";
pub const GOODBYE: &str = "Goodbye!";
pub const NOT_UNDERSTOOD: &str =
    "Sorry, I didn't catch that. You can ask me anything, or say stop to end.";

/// Dispatch targets, tried in [`ROUTES`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Launch,
    Chat,
    Stop,
    SessionEnded,
    /// Matches anything; must stay last
    Unrecognized,
}

pub const ROUTES: [Route; 5] = [
    Route::Launch,
    Route::Chat,
    Route::Stop,
    Route::SessionEnded,
    Route::Unrecognized,
];

impl Route {
    pub fn matches(self, request: &Request) -> bool {
        match self {
            Route::Launch => matches!(request, Request::Launch { .. }),
            Route::Chat => request.intent_name() == Some(CHAT_INTENT),
            Route::Stop => request
                .intent_name()
                .is_some_and(|name| STOP_INTENTS.contains(&name)),
            Route::SessionEnded => matches!(request, Request::SessionEnded { .. }),
            Route::Unrecognized => true,
        }
    }

    /// First route whose predicate accepts the request
    pub fn select(request: &Request) -> Route {
        ROUTES
            .into_iter()
            .find(|route| route.matches(request))
            .unwrap_or(Route::Unrecognized)
    }

    pub fn name(self) -> &'static str {
        match self {
            Route::Launch => "launch",
            Route::Chat => "chat",
            Route::Stop => "stop",
            Route::SessionEnded => "session_ended",
            Route::Unrecognized => "unrecognized",
        }
    }
}

/// Fresh → Primed. No remote call; the acknowledgement is canned.
pub fn launch(
    settings: &SkillSettings,
    mut attributes: SessionAttributes,
) -> Result<TurnOutcome, SkillError> {
    if attributes.has_history() {
        tracing::debug!("History already present, launch leaves it alone");
    } else {
        attributes.set_history(&History::primed(settings.max_response_words))?;
        tracing::debug!(
            max_words = settings.max_response_words,
            "Primed new session history"
        );
    }

    Ok(TurnOutcome {
        reply: Reply::ask(WELCOME, WELCOME),
        attributes,
    })
}

/// Primed/Active → Active. One remote call; a failed call leaves the
/// attributes exactly as they came in.
pub async fn chat(
    llm: &dyn LlmService,
    settings: &SkillSettings,
    intent: &Intent,
    mut attributes: SessionAttributes,
) -> Result<TurnOutcome, SkillError> {
    let query = intent
        .slot_value(QUERY_SLOT)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| SkillError::MissingSlot {
            intent: intent.name.clone(),
            slot: QUERY_SLOT,
        })?;

    let mut history = attributes.history()?.unwrap_or_default();
    history.push(Turn::user(query));

    match llm.complete(history.turns()).await {
        Ok(text) => {
            history.push(Turn::model(text.clone()));
            let dropped = history.enforce_limit(settings.max_history_turns);
            if dropped > 0 {
                tracing::info!(
                    dropped,
                    remaining = history.len(),
                    "Trimmed oldest exchanges from history"
                );
            }
            attributes.set_history(&history)?;
            Ok(TurnOutcome {
                reply: Reply::ask(text, CHAT_REPROMPT),
                attributes,
            })
        }
        Err(e) => {
            history.pop();
            tracing::warn!(
                kind = ?e.kind,
                error = %e.message,
                history_turns = history.len(),
                "No reply from model, user turn rolled back"
            );
            Ok(TurnOutcome {
                reply: Reply::ask(format!("{NO_RESPONSE} {}", e.message), CHAT_REPROMPT),
                attributes,
            })
        }
    }
}

/// Any → Terminal. History is not touched.
pub fn stop(attributes: SessionAttributes) -> TurnOutcome {
    TurnOutcome {
        reply: Reply::tell(GOODBYE),
        attributes,
    }
}

/// The platform closed the session on its own; it accepts no speech here.
pub fn session_ended(request: &Request, attributes: SessionAttributes) -> TurnOutcome {
    if let Request::SessionEnded { reason, error, .. } = request {
        tracing::info!(reason = ?reason, error = ?error, "Session ended by platform");
    }
    TurnOutcome {
        reply: Reply::silent(),
        attributes,
    }
}

/// Intents the skill has no handler for. History is not touched.
pub fn unrecognized(request: &Request, attributes: SessionAttributes) -> TurnOutcome {
    tracing::warn!(
        request = request.kind(),
        intent = request.intent_name().unwrap_or("-"),
        "No handler for request"
    );
    TurnOutcome {
        reply: Reply::ask(NOT_UNDERSTOOD, NOT_UNDERSTOOD),
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_request(name: &str) -> Request {
        Request::intent(Intent::new(name))
    }

    #[test]
    fn test_route_selection() {
        assert_eq!(Route::select(&Request::launch()), Route::Launch);
        assert_eq!(Route::select(&intent_request("ChatIntent")), Route::Chat);
        assert_eq!(Route::select(&intent_request("AMAZON.StopIntent")), Route::Stop);
        assert_eq!(Route::select(&intent_request("AMAZON.CancelIntent")), Route::Stop);
        assert_eq!(
            Route::select(&Request::SessionEnded {
                request_id: String::new(),
                reason: Some("USER_INITIATED".to_string()),
                error: None,
            }),
            Route::SessionEnded
        );
        assert_eq!(Route::select(&intent_request("AMAZON.HelpIntent")), Route::Unrecognized);
        assert_eq!(Route::select(&Request::Other), Route::Unrecognized);
    }

    #[test]
    fn test_unrecognized_is_last_and_total() {
        assert_eq!(ROUTES.last(), Some(&Route::Unrecognized));
        assert!(Route::Unrecognized.matches(&Request::launch()));
    }

    #[test]
    fn test_launch_keeps_existing_history() {
        let mut attrs = SessionAttributes::new();
        let existing = History::from(vec![Turn::user("q"), Turn::model("a")]);
        attrs.set_history(&existing).unwrap();

        let outcome = launch(&SkillSettings::default(), attrs).unwrap();
        assert_eq!(outcome.attributes.history().unwrap(), Some(existing));
        assert_eq!(outcome.reply.speech.as_deref(), Some(WELCOME));
        assert!(outcome.reply.keep_listening);
    }

    #[test]
    fn test_session_ended_is_silent() {
        let request = Request::SessionEnded {
            request_id: String::new(),
            reason: Some("EXCEEDED_MAX_REPROMPTS".to_string()),
            error: None,
        };
        let outcome = session_ended(&request, SessionAttributes::new());
        assert!(outcome.reply.speech.is_none());
        assert!(!outcome.reply.keep_listening);
    }
}
