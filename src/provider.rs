//! Provider identifiers
//!
//! The closed set of vendor integrations known to the selector. Every
//! `ProviderId` has exactly one probe adapter registered in
//! [`crate::probe::ProbeRegistry`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque model name within a provider's namespace
///
/// No cross-provider uniqueness is assumed: `"mixtral-8x7b"` under Groq and
/// under Mistral are unrelated identifiers.
pub type ModelId = String;

/// Vendor integration identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    OpenAi,
    Anthropic,
    Groq,
    Mistral,
    DeepSeek,
    OpenRouter,
}

impl ProviderId {
    /// Every provider, in declaration order
    pub const ALL: [ProviderId; 7] = [
        ProviderId::Gemini,
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Groq,
        ProviderId::Mistral,
        ProviderId::DeepSeek,
        ProviderId::OpenRouter,
    ];

    /// Convert to string representation for logging and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Groq => "groq",
            Self::Mistral => "mistral",
            Self::DeepSeek => "deepseek",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Public API base URL for this vendor
    ///
    /// Can be overridden per provider in config (`base_url`), which is how
    /// self-hosted gateways and the integration tests point probes elsewhere.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
            Self::DeepSeek => "https://api.deepseek.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                format!("Unknown provider: '{}'. Known providers: {}", s, known.join(", "))
            })
    }
}
