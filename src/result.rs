//! Selection result assembly

use crate::policy::Policy;
use crate::probe::ProbeAttempt;
use crate::provider::{ModelId, ProviderId};
use serde::Serialize;

/// Which selector phase produced the winning candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Policy-preferred models, in policy priority order
    Preferred,
    /// Every remaining active configured model
    Exhaustive,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::Exhaustive => "exhaustive",
        }
    }
}

/// Winning provider/model of one selection run plus how it got there
///
/// Transient: created once per successful run and handed to the caller, who
/// uses `provider()`/`model()` as the routing key for the real generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
    provider: ProviderId,
    model: ModelId,
    attempts: Vec<ProbeAttempt>,
    fallback_used: bool,
    phase: Phase,
}

impl SelectionResult {
    /// Package the winner with the full attempts log
    ///
    /// `fallback_used` comes from the winner's position in the policy's
    /// priority order only; the phase is reported separately.
    pub fn assemble(
        provider: ProviderId,
        model: ModelId,
        attempts: Vec<ProbeAttempt>,
        phase: Phase,
        policy: &Policy,
    ) -> Self {
        Self {
            provider,
            model,
            attempts,
            fallback_used: policy.is_fallback(provider),
            phase,
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Every attempt made during the run, in call order; the last one is the winner
    pub fn attempts(&self) -> &[ProbeAttempt] {
        &self.attempts
    }

    pub fn fallback_used(&self) -> bool {
        self.fallback_used
    }

    pub fn winning_phase(&self) -> Phase {
        self.phase
    }
}
