//! Environment configuration
//!
//! Read once at startup. The API key is folded into a [`GeminiEndpoint`]
//! here and never handled again.

use crate::llm::GeminiEndpoint;
use crate::skill::SkillSettings;
#[cfg(test)]
use std::collections::HashMap;
use std::num::{NonZeroU32, NonZeroU64};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Everything the service needs to start
#[derive(Debug, Clone)]
pub struct SkillConfig {
    pub endpoint: GeminiEndpoint,
    pub timeout: Duration,
    pub settings: SkillSettings,
    pub port: u16,
}

impl SkillConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    #[cfg(test)]
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("GOOGLE_API_KEY");
        let model = var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let defaults = SkillSettings::default();
        let settings = SkillSettings {
            max_response_words: parse_var::<NonZeroU32>(
                "MAX_RESPONSE_WORDS",
                var("MAX_RESPONSE_WORDS"),
                "positive integer",
            )?
            .map_or(defaults.max_response_words, NonZeroU32::get),
            max_history_turns: parse_var(
                "MAX_HISTORY_TURNS",
                var("MAX_HISTORY_TURNS"),
                "non-negative integer",
            )?
            .unwrap_or(defaults.max_history_turns),
        };
        let timeout_secs = parse_var::<NonZeroU64>(
            "GEMINI_TIMEOUT_SECS",
            var("GEMINI_TIMEOUT_SECS"),
            "positive number of seconds",
        )?
        .map_or(DEFAULT_TIMEOUT_SECS, NonZeroU64::get);
        let port = parse_var("SKILL_PORT", var("SKILL_PORT"), "port number")?.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            endpoint: GeminiEndpoint::new(&base_url, &model, api_key.as_deref()),
            timeout: Duration::from_secs(timeout_secs),
            settings,
            port,
        })
    }
}

/// Parse a set variable; `None` when it is unset
fn parse_var<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name,
                expected,
                value: raw.clone(),
            })
        })
        .transpose()
}
