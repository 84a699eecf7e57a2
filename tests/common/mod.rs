//! Shared fixtures for selector integration tests
//!
//! `ScriptedAdapter` stands in for a vendor: each model name maps to a scripted
//! outcome, and every call is appended to a log shared across adapters so tests
//! can assert the exact cross-provider call order.

#![allow(dead_code)]

use async_trait::async_trait;
use llm_failover::candidates::{EnvCredentialDecryptor, StaticConfigStore};
use llm_failover::error::TransportError;
use llm_failover::{
    CandidateSource, ModelConfig, ProbeAdapter, ProbeRegistry, Prober, ProviderConfig, ProviderId,
    Secret, Selector, SelectorOptions,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted outcome for one model
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed,
    SucceedAfter(Duration),
    Fail(u16),
    FailAfter(Duration, u16),
    /// Never answers within any reasonable test timeout
    Hang,
}

pub type CallLog = Arc<Mutex<Vec<(ProviderId, String)>>>;

pub fn new_call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<(ProviderId, String)> {
    log.lock().unwrap().clone()
}

pub struct ScriptedAdapter {
    provider: ProviderId,
    scripts: HashMap<String, Script>,
    log: CallLog,
}

impl ScriptedAdapter {
    pub fn new(provider: ProviderId, scripts: &[(&str, Script)], log: &CallLog) -> Self {
        Self {
            provider,
            scripts: scripts
                .iter()
                .map(|(model, script)| (model.to_string(), *script))
                .collect(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl ProbeAdapter for ScriptedAdapter {
    async fn test_call(
        &self,
        model: &str,
        _secret: &Secret,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        self.log
            .lock()
            .unwrap()
            .push((self.provider, model.to_string()));

        // Unscripted models behave like a retired model name
        let script = self.scripts.get(model).copied().unwrap_or(Script::Fail(404));
        match script {
            Script::Succeed => Ok(()),
            Script::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Script::Fail(status) => Err(TransportError::Http {
                status,
                body: "scripted failure".to_string(),
            }),
            Script::FailAfter(delay, status) => {
                tokio::time::sleep(delay).await;
                Err(TransportError::Http {
                    status,
                    body: "scripted failure".to_string(),
                })
            }
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

/// Provider snapshot with a plain credential
pub fn provider(id: ProviderId, active: bool, models: &[(&str, bool)]) -> ProviderConfig {
    provider_with_credential(id, Some("plain:test-key"), active, models)
}

pub fn provider_with_credential(
    id: ProviderId,
    credential: Option<&str>,
    active: bool,
    models: &[(&str, bool)],
) -> ProviderConfig {
    ProviderConfig {
        provider: id,
        credential: credential.map(str::to_string),
        is_active: active,
        models: models
            .iter()
            .map(|(name, active)| ModelConfig::new(*name, *active))
            .collect(),
    }
}

/// Registry with one scripted adapter per provider
pub fn scripted_registry(
    scripts: &[(ProviderId, &[(&str, Script)])],
    log: &CallLog,
) -> ProbeRegistry {
    scripts
        .iter()
        .fold(ProbeRegistry::new(), |registry, (provider, models)| {
            registry.with_adapter(
                *provider,
                Arc::new(ScriptedAdapter::new(*provider, models, log)),
            )
        })
}

/// Selector over a static store; `env:` credentials never resolve
pub fn selector(
    configs: Vec<ProviderConfig>,
    registry: ProbeRegistry,
    options: SelectorOptions,
) -> Selector {
    let store = Arc::new(StaticConfigStore::new(configs));
    let decryptor = Arc::new(EnvCredentialDecryptor::with_lookup(|_| None));
    Selector::new(
        CandidateSource::new(store, decryptor),
        Prober::new(registry),
        options,
    )
}

/// Short probe timeout so hung adapters fail fast when not cancelled
pub fn fast_options() -> SelectorOptions {
    SelectorOptions {
        probe_timeout: Duration::from_secs(2),
        max_concurrent_probes: 1,
    }
}

/// (provider, model, success) triples of an attempts log
pub fn summarize(attempts: &[llm_failover::ProbeAttempt]) -> Vec<(ProviderId, String, bool)> {
    attempts
        .iter()
        .map(|a| (a.provider(), a.model().to_string(), a.is_success()))
        .collect()
}
