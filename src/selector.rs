//! Two-phase provider/model selection
//!
//! # Phases
//! 1. **Preferred**: walk the policy's priority order. For each provider that
//!    is configured and eligible, probe the policy's preferred models for it,
//!    whether or not those models appear in the provider's configuration.
//! 2. **Exhaustive**: only if phase 1 found nothing. Walk the eligible
//!    providers again (policy order first, then unlisted providers in store
//!    order) and probe every active configured model not already tried.
//!
//! The first successful probe ends the run. There is no scoring: order alone
//! decides the winner.
//!
//! # Concurrency
//! Providers are always handled one after another. Within one provider's
//! model list up to `max_concurrent_probes` probes may be in flight; the first
//! success wins and the remaining in-flight probes are dropped unrecorded.
//! With the default of 1 the run is strictly sequential and the attempt order
//! is fully deterministic.
//!
//! # Cancellation
//! Every suspension point (store read, credential decryption, probe) races
//! against the caller's [`CancellationToken`] and optional deadline. When
//! either fires, the in-flight future is dropped, completed attempts are kept,
//! and the run ends with [`SelectionError::Cancelled`].

use crate::candidates::{
    CandidateSource, EnvCredentialDecryptor, ProviderConfig, Secret, StaticConfigStore,
};
use crate::config::Config;
use crate::error::{AppResult, DecryptionError, SelectionError};
use crate::metrics::{Metrics, ProbeOutcome};
use crate::policy::Policy;
use crate::probe::{ProbeAttempt, ProbeRegistry, Prober};
use crate::provider::{ModelId, ProviderId};
use crate::result::{Phase, SelectionResult};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Default per-probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Selector tuning knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorOptions {
    /// Upper bound on a single probe, independent of the run's deadline
    pub probe_timeout: Duration,
    /// Probes allowed in flight within one provider's model list
    pub max_concurrent_probes: usize,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrent_probes: 1,
        }
    }
}

/// Chooses a working (provider, model) at request time
pub struct Selector {
    candidates: CandidateSource,
    prober: Prober,
    options: SelectorOptions,
    metrics: Option<Arc<Metrics>>,
}

impl Selector {
    pub fn new(candidates: CandidateSource, prober: Prober, options: SelectorOptions) -> Self {
        Self {
            candidates,
            prober,
            options,
            metrics: None,
        }
    }

    /// Selector over the providers listed in `config`
    ///
    /// Uses the config file as the store snapshot, resolves credentials from
    /// the environment, and probes through the standard HTTP adapters.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let store = Arc::new(StaticConfigStore::new(config.provider_configs()));
        let decryptor = Arc::new(EnvCredentialDecryptor::new());
        let registry = ProbeRegistry::standard(&config.base_url_overrides())?;

        Ok(Self::new(
            CandidateSource::new(store, decryptor),
            Prober::new(registry),
            config.selector_options(),
        ))
    }

    /// Record probe and selection metrics into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn options(&self) -> SelectorOptions {
        self.options
    }

    /// Run one selection against fresh configuration
    ///
    /// # Errors
    /// - `NoProvidersConfigured` if no provider is active with a credential
    /// - `NoProviderAvailable` if every candidate in both phases failed
    /// - `Cancelled` if `cancel` fired or `deadline` passed mid-run
    /// - `Store` if the configuration store could not be read
    pub async fn select(
        &self,
        policy: &Policy,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<SelectionResult, SelectionError> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("selection", run_id = %run_id);

        let outcome = async {
            let mut run = Run::new(self, policy, cancel, deadline);
            run.execute().await
        }
        .instrument(span)
        .await;

        if let Some(metrics) = &self.metrics {
            let recorded = match &outcome {
                Ok(result) => metrics.record_selection(result),
                Err(error) => metrics.record_selection_failure(error),
            };
            if let Err(e) = recorded {
                tracing::warn!(error = %e, run_id = %run_id, "Failed to record selection metrics");
            }
        }

        outcome
    }
}

/// Marker for a run interrupted by cancellation or deadline
struct Interrupted;

/// State of one selection run; never shared between runs
struct Run<'a> {
    selector: &'a Selector,
    policy: &'a Policy,
    cancel: &'a CancellationToken,
    deadline: Option<Instant>,
    attempts: Vec<ProbeAttempt>,
    attempted: HashSet<(ProviderId, ModelId)>,
    secrets: HashMap<ProviderId, Result<Secret, DecryptionError>>,
}

impl<'a> Run<'a> {
    fn new(
        selector: &'a Selector,
        policy: &'a Policy,
        cancel: &'a CancellationToken,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            selector,
            policy,
            cancel,
            deadline,
            attempts: Vec::new(),
            attempted: HashSet::new(),
            secrets: HashMap::new(),
        }
    }

    async fn execute(&mut self) -> Result<SelectionResult, SelectionError> {
        let selector = self.selector;
        let configs = match self.guard(selector.candidates.active_configs()).await {
            Ok(result) => result?,
            Err(Interrupted) => return Err(self.cancelled()),
        };

        if configs.is_empty() {
            tracing::warn!("No active provider with a credential; skipping probes");
            return Err(SelectionError::NoProvidersConfigured {
                attempts: Vec::new(),
            });
        }

        match self.preferred_pass(&configs).await {
            Ok(Some((provider, model))) => return Ok(self.finish(provider, model, Phase::Preferred)),
            Ok(None) => {}
            Err(Interrupted) => return Err(self.cancelled()),
        }

        tracing::info!(
            attempts = self.attempts.len(),
            "No preferred model succeeded, trying every active configured model"
        );

        match self.exhaustive_pass(&configs).await {
            Ok(Some((provider, model))) => Ok(self.finish(provider, model, Phase::Exhaustive)),
            Ok(None) => {
                tracing::error!(
                    attempts = self.attempts.len(),
                    eligible_providers = configs.len(),
                    "Every candidate failed; no provider available"
                );
                Err(SelectionError::NoProviderAvailable {
                    attempts: std::mem::take(&mut self.attempts),
                })
            }
            Err(Interrupted) => Err(self.cancelled()),
        }
    }

    async fn preferred_pass(
        &mut self,
        configs: &[ProviderConfig],
    ) -> Result<Option<(ProviderId, ModelId)>, Interrupted> {
        let policy = self.policy;
        for provider in policy.priority() {
            // Unconfigured or ineligible providers are skipped without an attempt
            let Some(config) = configs.iter().find(|c| c.provider == *provider) else {
                continue;
            };

            let models = policy.preferred_models(*provider).to_vec();
            if let Some(model) = self.try_provider(config, models, Phase::Preferred).await? {
                return Ok(Some((*provider, model)));
            }
        }
        Ok(None)
    }

    async fn exhaustive_pass(
        &mut self,
        configs: &[ProviderConfig],
    ) -> Result<Option<(ProviderId, ModelId)>, Interrupted> {
        for config in exhaustive_order(self.policy, configs) {
            let models = config.active_models().map(|m| m.model.clone()).collect();
            if let Some(model) = self.try_provider(config, models, Phase::Exhaustive).await? {
                return Ok(Some((config.provider, model)));
            }
        }
        Ok(None)
    }

    /// Probe `models` under one provider; `Some(model)` on the first success
    async fn try_provider(
        &mut self,
        config: &ProviderConfig,
        models: Vec<ModelId>,
        phase: Phase,
    ) -> Result<Option<ModelId>, Interrupted> {
        let provider = config.provider;

        let mut fresh = HashSet::new();
        let models: Vec<ModelId> = models
            .into_iter()
            .filter(|m| !self.attempted.contains(&(provider, m.clone())) && fresh.insert(m.clone()))
            .collect();
        if models.is_empty() {
            return Ok(None);
        }

        tracing::debug!(
            provider = %provider,
            phase = phase.as_str(),
            models = ?models,
            "Trying provider"
        );

        let secret = match self.secret_for(config).await? {
            Ok(secret) => secret,
            Err(e) => {
                tracing::warn!(
                    provider = %provider,
                    phase = phase.as_str(),
                    error = %e,
                    "Credential could not be decrypted; skipping provider's models"
                );
                for model in models {
                    let attempt = ProbeAttempt::failure(
                        provider,
                        model,
                        Duration::ZERO,
                        format!("decryption failed: {}", e),
                    );
                    self.record(attempt, false);
                }
                return Ok(None);
            }
        };

        self.probe_models(provider, &secret, &models).await
    }

    /// Decrypt a provider's credential at most once per run
    async fn secret_for(
        &mut self,
        config: &ProviderConfig,
    ) -> Result<Result<Secret, DecryptionError>, Interrupted> {
        if let Some(cached) = self.secrets.get(&config.provider) {
            return Ok(cached.clone());
        }

        let selector = self.selector;
        let resolved = self.guard(selector.candidates.resolve_credential(config)).await?;
        self.secrets.insert(config.provider, resolved.clone());
        Ok(resolved)
    }

    async fn probe_models(
        &mut self,
        provider: ProviderId,
        secret: &Secret,
        models: &[ModelId],
    ) -> Result<Option<ModelId>, Interrupted> {
        let selector = self.selector;
        let limit = selector.options.max_concurrent_probes.max(1);
        let timeout = selector.options.probe_timeout;

        let mut pending = models.iter();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < limit {
                let Some(model) = pending.next() else { break };
                self.attempted.insert((provider, model.clone()));
                in_flight.push(selector.prober.probe(provider, model, secret, timeout));
            }

            // Dropping `in_flight` on return aborts whatever is still running
            let Some(attempt) = self.guard(in_flight.next()).await? else {
                return Ok(None);
            };

            if attempt.is_success() {
                let model = attempt.model().to_string();
                self.record(attempt, true);
                return Ok(Some(model));
            }
            self.record(attempt, true);
        }
    }

    fn record(&mut self, attempt: ProbeAttempt, probed: bool) {
        if probed && let Some(metrics) = &self.selector.metrics {
            let outcome = if attempt.is_success() {
                ProbeOutcome::Success
            } else {
                ProbeOutcome::Failure
            };
            if let Err(e) = metrics.record_probe(attempt.provider(), outcome, attempt.latency()) {
                tracing::warn!(error = %e, "Failed to record probe metrics");
            }
        }
        self.attempted
            .insert((attempt.provider(), attempt.model().to_string()));
        self.attempts.push(attempt);
    }

    fn finish(&mut self, provider: ProviderId, model: ModelId, phase: Phase) -> SelectionResult {
        let attempts = std::mem::take(&mut self.attempts);
        let result = SelectionResult::assemble(provider, model, attempts, phase, self.policy);

        if result.fallback_used() {
            tracing::warn!(
                provider = %result.provider(),
                model = %result.model(),
                phase = phase.as_str(),
                attempts = result.attempts().len(),
                "Selected fallback provider; primary providers are degraded"
            );
        } else {
            tracing::info!(
                provider = %result.provider(),
                model = %result.model(),
                phase = phase.as_str(),
                attempts = result.attempts().len(),
                "Selected provider"
            );
        }
        result
    }

    fn cancelled(&mut self) -> SelectionError {
        tracing::info!(
            completed_attempts = self.attempts.len(),
            "Selection cancelled"
        );
        SelectionError::Cancelled {
            attempts: std::mem::take(&mut self.attempts),
        }
    }

    /// Await `fut` unless the run is cancelled or its deadline passes first
    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted),
            _ = expired => Err(Interrupted),
            output = fut => Ok(output),
        }
    }
}

/// Eligible providers for the exhaustive pass: policy order, then the rest in store order
///
/// `configs` holds at most one entry per provider (see
/// [`CandidateSource::active_configs`]); every entry is returned exactly once.
fn exhaustive_order<'c>(policy: &Policy, configs: &'c [ProviderConfig]) -> Vec<&'c ProviderConfig> {
    let mut ordered: Vec<&ProviderConfig> = configs.iter().collect();
    // Stable: unlisted providers keep their store order behind the listed ones
    ordered.sort_by_key(|c| policy.priority_index(c.provider).unwrap_or(usize::MAX));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::ModelConfig;

    fn config(provider: ProviderId) -> ProviderConfig {
        ProviderConfig {
            provider,
            credential: Some("k".to_string()),
            is_active: true,
            models: vec![ModelConfig::new("m", true)],
        }
    }

    #[test]
    fn test_exhaustive_order_puts_unlisted_providers_last() {
        let policy = Policy::new(
            vec![ProviderId::Anthropic, ProviderId::OpenAi],
            HashMap::new(),
        )
        .unwrap();
        let configs = vec![
            config(ProviderId::Groq),
            config(ProviderId::OpenAi),
            config(ProviderId::Mistral),
            config(ProviderId::Anthropic),
        ];

        let order: Vec<ProviderId> = exhaustive_order(&policy, &configs)
            .into_iter()
            .map(|c| c.provider)
            .collect();

        assert_eq!(
            order,
            vec![
                ProviderId::Anthropic,
                ProviderId::OpenAi,
                ProviderId::Groq,
                ProviderId::Mistral
            ]
        );
    }

    #[test]
    fn test_default_options_are_sequential() {
        let options = SelectorOptions::default();
        assert_eq!(options.max_concurrent_probes, 1);
        assert_eq!(options.probe_timeout, DEFAULT_PROBE_TIMEOUT);
    }
}
