//! Conversation state kept in the platform's session attributes
//!
//! The platform owns the attribute bag and hands it back on every request.
//! Only the `history` key is interpreted here; everything else is carried
//! through untouched.

use crate::llm::Turn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Attribute key holding the conversation history
pub const HISTORY_KEY: &str = "history";

/// Turns at the head of the history that trimming never removes
const PINNED_TURNS: usize = 2;

/// Acknowledgement stored as the model half of the priming pair
pub const PRIMING_ACK: &str = "Understood. I will keep responses concise.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session attribute 'history' is malformed: {0}")]
    MalformedHistory(#[source] serde_json::Error),
    #[error("failed to encode history: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Opaque session attribute bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionAttributes(Map<String, Value>);

impl SessionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_history(&self) -> bool {
        self.0.contains_key(HISTORY_KEY)
    }

    /// Decode the stored history, `None` when the key is absent
    pub fn history(&self) -> Result<Option<History>, SessionError> {
        self.0
            .get(HISTORY_KEY)
            .map(|value| {
                Vec::<Turn>::deserialize(value)
                    .map(History::from)
                    .map_err(SessionError::MalformedHistory)
            })
            .transpose()
    }

    pub fn set_history(&mut self, history: &History) -> Result<(), SessionError> {
        let value = serde_json::to_value(history.turns()).map_err(SessionError::Encode)?;
        self.0.insert(HISTORY_KEY.to_string(), value);
        Ok(())
    }

    pub fn phase(&self) -> Result<Phase, SessionError> {
        Ok(match self.history()? {
            None => Phase::Fresh,
            Some(history) if history.len() <= PINNED_TURNS => Phase::Primed,
            Some(_) => Phase::Active,
        })
    }

}

#[cfg(test)]
impl SessionAttributes {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

/// Where a session is in its lifetime, judged from its history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No history attribute yet
    Fresh,
    /// Only the priming pair (or nothing) so far
    Primed,
    /// At least one real exchange recorded
    Active,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Fresh => "fresh",
            Phase::Primed => "primed",
            Phase::Active => "active",
        }
    }
}

/// Ordered conversation history, replayed to the model on every chat turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// The synthetic pair inserted at launch to bound reply length
    pub fn primed(max_words: u32) -> Self {
        Self {
            turns: vec![
                Turn::user(priming_instruction(max_words)),
                Turn::model(PRIMING_ACK),
            ],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn pop(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    /// Drop the oldest exchanges after the pinned head until at most
    /// `max_turns` remain. Whole user/model pairs go together, and the
    /// latest exchange always survives. Returns the number of turns dropped.
    pub fn enforce_limit(&mut self, max_turns: usize) -> usize {
        let limit = max_turns.max(PINNED_TURNS + 2);
        if self.turns.len() <= limit {
            return 0;
        }
        let excess = self.turns.len() - limit;
        let drop = excess + excess % 2;
        self.turns.drain(PINNED_TURNS..PINNED_TURNS + drop);
        drop
    }
}

#[cfg(test)]
impl History {
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// True when the history ends with a user turn answered by a model turn
    pub fn ends_with_exchange(&self) -> bool {
        match self.turns.as_slice() {
            [.., user, model] => {
                user.role() == crate::llm::Role::User && model.role() == crate::llm::Role::Model
            }
            _ => false,
        }
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

/// Word-limit instruction sent as the first user turn
pub fn priming_instruction(max_words: u32) -> String {
    format!("Hello! Respond in English clearly and keep your response under {max_words} words. OK?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use serde_json::json;

    fn exchange(n: usize) -> [Turn; 2] {
        [Turn::user(format!("q{n}")), Turn::model(format!("a{n}"))]
    }

    fn history_with(exchanges: usize) -> History {
        let mut history = History::primed(300);
        for n in 0..exchanges {
            let [q, a] = exchange(n);
            history.push(q);
            history.push(a);
        }
        history
    }

    #[test]
    fn test_primed_history() {
        let history = History::primed(120);
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].role(), Role::User);
        assert!(history.turns()[0].text().contains("under 120 words"));
        assert_eq!(history.turns()[1], Turn::model(PRIMING_ACK));
        assert!(history.ends_with_exchange());
    }

    #[test]
    fn test_absent_history_is_none() {
        let attrs = SessionAttributes::new();
        assert!(!attrs.has_history());
        assert!(attrs.history().unwrap().is_none());
        assert_eq!(attrs.phase().unwrap(), Phase::Fresh);
        assert_eq!(Phase::Fresh.as_str(), "fresh");
    }

    #[test]
    fn test_history_roundtrips_through_attributes() {
        let mut attrs: SessionAttributes =
            serde_json::from_value(json!({"favoriteColor": "blue"})).unwrap();
        let history = history_with(1);
        attrs.set_history(&history).unwrap();

        assert_eq!(attrs.history().unwrap(), Some(history));
        assert_eq!(attrs.get("favoriteColor"), Some(&json!("blue")));
        assert_eq!(attrs.phase().unwrap(), Phase::Active);
        assert_eq!(
            serde_json::to_value(&attrs).unwrap()["history"][2],
            json!({"role": "user", "parts": [{"text": "q0"}]})
        );
    }

    #[test]
    fn test_malformed_history_is_an_error() {
        let attrs: SessionAttributes =
            serde_json::from_value(json!({"history": "not a list"})).unwrap();
        assert!(matches!(
            attrs.history(),
            Err(SessionError::MalformedHistory(_))
        ));
    }

    #[test]
    fn test_enforce_limit_keeps_priming_pair_and_latest_exchange() {
        let mut history = history_with(5); // 12 turns
        let dropped = history.enforce_limit(8);
        assert_eq!(dropped, 4);
        assert_eq!(history.len(), 8);
        assert_eq!(history.turns()[1].text(), PRIMING_ACK);
        assert_eq!(history.turns()[2].text(), "q2");
        assert_eq!(history.last().unwrap().text(), "a4");
        assert!(history.ends_with_exchange());
    }

    #[test]
    fn test_enforce_limit_drops_whole_pairs() {
        let mut history = history_with(3); // 8 turns
        assert_eq!(history.enforce_limit(7), 2);
        assert_eq!(history.len(), 6);
        assert_eq!(history.turns()[2].role(), Role::User);
    }

    #[test]
    fn test_enforce_limit_never_drops_below_floor() {
        let mut history = history_with(3);
        history.enforce_limit(0);
        assert_eq!(history.len(), 4);
        assert_eq!(history.last().unwrap().text(), "a2");
    }

    #[test]
    fn test_enforce_limit_under_cap_is_a_no_op() {
        let mut history = history_with(2);
        assert_eq!(history.enforce_limit(100), 0);
        assert_eq!(history, history_with(2));
    }
}
