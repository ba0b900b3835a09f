//! Voice platform request/response envelopes
//!
//! Only the fields the skill reads are modelled; everything else in the
//! inbound JSON is ignored.

use crate::session::SessionAttributes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const ENVELOPE_VERSION: &str = "1.0";

fn default_version() -> String {
    ENVELOPE_VERSION.to_string()
}

/// Inbound request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub session: Option<Session>,
    pub request: Request,
}

impl RequestEnvelope {
    pub fn new(session: Session, request: Request) -> Self {
        Self {
            version: default_version(),
            session: Some(session),
            request,
        }
    }
}

/// Session block of the inbound envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub attributes: SessionAttributes,
}

/// The request proper, discriminated by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "LaunchRequest", rename_all = "camelCase")]
    Launch {
        #[serde(default)]
        request_id: String,
    },
    #[serde(rename = "IntentRequest", rename_all = "camelCase")]
    Intent {
        #[serde(default)]
        request_id: String,
        intent: Intent,
    },
    #[serde(rename = "SessionEndedRequest", rename_all = "camelCase")]
    SessionEnded {
        #[serde(default)]
        request_id: String,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        error: Option<serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

impl Request {
    pub fn launch() -> Self {
        Request::Launch {
            request_id: String::new(),
        }
    }

    pub fn intent(intent: Intent) -> Self {
        Request::Intent {
            request_id: String::new(),
            intent,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Launch { .. } => "LaunchRequest",
            Request::Intent { .. } => "IntentRequest",
            Request::SessionEnded { .. } => "SessionEndedRequest",
            Request::Other => "Other",
        }
    }

    pub fn intent_name(&self) -> Option<&str> {
        match self {
            Request::Intent { intent, .. } => Some(&intent.name),
            _ => None,
        }
    }
}

/// Recognized intent with its slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: HashMap<String, Slot>,
}

impl Intent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_slot(mut self, name: &str, value: impl Into<String>) -> Self {
        self.slots.insert(
            name.to_string(),
            Slot {
                name: name.to_string(),
                value: Some(value.into()),
            },
        );
        self
    }

    pub fn slot_value(&self, name: &str) -> Option<&str> {
        self.slots.get(name).and_then(|s| s.value.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Outbound response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub version: String,
    pub session_attributes: SessionAttributes,
    pub response: ResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    pub should_end_session: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

/// Speech rendered as SSML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub kind: String,
    pub ssml: String,
}

impl OutputSpeech {
    pub fn ssml(text: &str) -> Self {
        Self {
            kind: "SSML".to_string(),
            ssml: format!("<speak>{}</speak>", escape_ssml(text)),
        }
    }
}

impl ResponseEnvelope {
    pub fn new(
        speech: Option<&str>,
        reprompt: Option<&str>,
        keep_listening: bool,
        session_attributes: SessionAttributes,
    ) -> Self {
        Self {
            version: default_version(),
            session_attributes,
            response: ResponseBody {
                output_speech: speech.map(OutputSpeech::ssml),
                reprompt: reprompt.map(|text| Reprompt {
                    output_speech: OutputSpeech::ssml(text),
                }),
                should_end_session: !keep_listening,
            },
        }
    }
}

/// Model replies are free text; keep them from breaking the SSML document.
fn escape_ssml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
