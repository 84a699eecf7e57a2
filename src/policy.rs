//! Static selection policy
//!
//! A `Policy` encodes intent, not availability: the order in which providers
//! should be tried and, per provider, the models known to work well. It is
//! built once and passed into the selector by reference, so tests can run
//! against synthetic policies.

use crate::error::{AppError, AppResult};
use crate::provider::{ModelId, ProviderId};
use std::collections::{HashMap, HashSet};

/// Number of leading priority slots that count as the primary tier
///
/// A selection won by a provider outside this tier is reported with
/// `fallback_used = true`.
pub const PRIMARY_TIER_SIZE: usize = 3;

/// Provider priority order plus preferred models per provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    priority: Vec<ProviderId>,
    preferred: HashMap<ProviderId, Vec<ModelId>>,
}

impl Policy {
    /// Create a policy from an explicit priority order and preferred-model table
    ///
    /// # Errors
    /// Returns `AppError::Config` if a provider appears twice in `priority`,
    /// or a provider's preferred list names the same model twice.
    pub fn new(
        priority: Vec<ProviderId>,
        preferred: HashMap<ProviderId, Vec<ModelId>>,
    ) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for provider in &priority {
            if !seen.insert(*provider) {
                return Err(AppError::Config(format!(
                    "policy.priority lists provider '{}' more than once",
                    provider
                )));
            }
        }

        for (provider, models) in &preferred {
            let mut seen_models = HashSet::new();
            for model in models {
                if !seen_models.insert(model.as_str()) {
                    return Err(AppError::Config(format!(
                        "policy.preferred.{} lists model '{}' more than once",
                        provider, model
                    )));
                }
            }
        }

        Ok(Self {
            priority,
            preferred,
        })
    }

    /// Known-good defaults used when the config has no `[policy]` table
    pub fn builtin() -> Self {
        let table: [(ProviderId, &[&str]); 7] = [
            (
                ProviderId::Gemini,
                &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"],
            ),
            (ProviderId::OpenAi, &["gpt-4o-mini", "gpt-4.1-mini"]),
            (
                ProviderId::Anthropic,
                &["claude-3-5-haiku-latest", "claude-3-haiku-20240307"],
            ),
            (
                ProviderId::Groq,
                &["llama-3.3-70b-versatile", "llama-3.1-8b-instant"],
            ),
            (
                ProviderId::Mistral,
                &["mistral-small-latest", "open-mistral-nemo"],
            ),
            (ProviderId::DeepSeek, &["deepseek-chat"]),
            (ProviderId::OpenRouter, &["openrouter/auto"]),
        ];

        let priority = table.iter().map(|(p, _)| *p).collect();
        let preferred = table
            .iter()
            .map(|(p, models)| (*p, models.iter().map(|m| m.to_string()).collect()))
            .collect();

        Self {
            priority,
            preferred,
        }
    }

    /// Providers in the order they should be tried
    pub fn priority(&self) -> &[ProviderId] {
        &self.priority
    }

    /// Zero-based position of `provider` in the priority order
    pub fn priority_index(&self, provider: ProviderId) -> Option<usize> {
        self.priority.iter().position(|p| *p == provider)
    }

    /// Preferred models for `provider`, empty if the policy names none
    pub fn preferred_models(&self, provider: ProviderId) -> &[ModelId] {
        self.preferred
            .get(&provider)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether winning with `provider` counts as a fallback selection
    ///
    /// Position-based: anything outside the first [`PRIMARY_TIER_SIZE`]
    /// priority slots is a fallback, including providers the policy does not
    /// list at all.
    pub fn is_fallback(&self, provider: ProviderId) -> bool {
        !matches!(self.priority_index(provider), Some(i) if i < PRIMARY_TIER_SIZE)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::builtin()
    }
}
