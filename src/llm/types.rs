//! Conversation turn types
//!
//! A [`Turn`] is stored in the session bag in the same shape the Gemini API
//! expects (`{"role": ..., "parts": [{"text": ...}]}`), so the history can be
//! replayed without translation.

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireTurn", try_from = "WireTurn")]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Text part of a content entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WirePart {
    pub text: String,
}

/// Gemini `Content` object, used both on the wire and in session attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireTurn {
    pub role: Role,
    pub parts: Vec<WirePart>,
}

impl From<Turn> for WireTurn {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role,
            parts: vec![WirePart { text: turn.text }],
        }
    }
}

impl From<&Turn> for WireTurn {
    fn from(turn: &Turn) -> Self {
        turn.clone().into()
    }
}

impl TryFrom<WireTurn> for Turn {
    type Error = String;

    fn try_from(wire: WireTurn) -> Result<Self, Self::Error> {
        if wire.parts.is_empty() {
            return Err(format!("{} turn has no parts", wire.role.as_str()));
        }
        // Multi-part entries only come from hand-edited bags; join them
        let text = wire
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(Self {
            role: wire.role,
            text,
        })
    }
}
