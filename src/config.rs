//! Configuration management for llm-failover
//!
//! Parses TOML configuration files and provides typed access to settings.
//! The `[[providers]]` table doubles as the configuration store snapshot used
//! by the command-line binary.

use crate::candidates::{ModelConfig, ProviderConfig};
use crate::error::{AppError, AppResult};
use crate::policy::Policy;
use crate::provider::{ModelId, ProviderId};
use crate::selector::SelectorOptions;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for `probe.timeout_seconds`
const MAX_PROBE_TIMEOUT_SECS: u64 = 120;
/// Upper bound for `selection.deadline_seconds`
const MAX_DEADLINE_SECS: u64 = 600;
/// Upper bound for `selection.max_concurrent_probes`
const MAX_CONCURRENT_PROBES: usize = 16;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Overrides the builtin policy when present
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_probe_timeout(),
        }
    }
}

fn default_probe_timeout() -> u64 {
    10
}

/// Selection run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Overall budget for one selection run; unbounded when absent
    #[serde(default)]
    pub deadline_seconds: Option<u64>,
    /// Probes allowed in flight within one provider's model list
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            deadline_seconds: None,
            max_concurrent_probes: default_max_concurrent_probes(),
        }
    }
}

fn default_max_concurrent_probes() -> usize {
    1
}

/// `[policy]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    pub priority: Vec<ProviderId>,
    #[serde(default)]
    pub preferred: HashMap<ProviderId, Vec<ModelId>>,
}

/// One `[[providers]]` entry
///
/// Fields are private; configuration is loaded via deserialization and
/// validated via `Config::validate()`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    id: ProviderId,
    #[serde(default)]
    credential: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
    /// Replaces the vendor's public API base URL
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    models: Vec<ModelSettings>,
}

impl ProviderSettings {
    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn models(&self) -> &[ModelSettings] {
        &self.models
    }

    /// Snapshot in the shape the candidate source consumes
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.id,
            credential: self.credential.clone(),
            is_active: self.is_active,
            models: self
                .models
                .iter()
                .map(|m| ModelConfig::new(m.name.clone(), m.is_active))
                .collect(),
        }
    }
}

/// One `[[providers.models]]` entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelSettings {
    name: ModelId,
    #[serde(default = "default_active")]
    is_active: bool,
}

impl ModelSettings {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

fn default_active() -> bool {
    true
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called automatically by `from_file()` and `from_str()`.
    pub fn validate(&self) -> AppResult<()> {
        if self.probe.timeout_seconds == 0 {
            return Err(AppError::Config(
                "probe.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.probe.timeout_seconds > MAX_PROBE_TIMEOUT_SECS {
            return Err(AppError::Config(format!(
                "probe.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_PROBE_TIMEOUT_SECS, self.probe.timeout_seconds
            )));
        }

        if let Some(deadline) = self.selection.deadline_seconds
            && (deadline == 0 || deadline > MAX_DEADLINE_SECS)
        {
            return Err(AppError::Config(format!(
                "selection.deadline_seconds must be in 1..={}, got {}",
                MAX_DEADLINE_SECS, deadline
            )));
        }

        let concurrency = self.selection.max_concurrent_probes;
        if concurrency == 0 || concurrency > MAX_CONCURRENT_PROBES {
            return Err(AppError::Config(format!(
                "selection.max_concurrent_probes must be in 1..={}, got {}",
                MAX_CONCURRENT_PROBES, concurrency
            )));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.id) {
                return Err(AppError::Config(format!(
                    "provider '{}' is configured more than once",
                    provider.id
                )));
            }

            if let Some(url) = &provider.base_url
                && !url.starts_with("http://")
                && !url.starts_with("https://")
            {
                return Err(AppError::Config(format!(
                    "provider '{}' has invalid base_url '{}'. \
                    base_url must start with 'http://' or 'https://'.",
                    provider.id, url
                )));
            }

            if let Some(model) = provider.models.iter().find(|m| m.name.trim().is_empty()) {
                return Err(AppError::Config(format!(
                    "provider '{}' has a model with an empty name (is_active = {})",
                    provider.id, model.is_active
                )));
            }
        }

        // Surfaces duplicate priority entries and duplicate preferred models
        self.policy()?;

        Ok(())
    }

    /// Policy from `[policy]`, or the builtin policy when the table is absent
    pub fn policy(&self) -> AppResult<Policy> {
        match &self.policy {
            Some(table) => Policy::new(table.priority.clone(), table.preferred.clone()),
            None => Ok(Policy::builtin()),
        }
    }

    /// Selector options derived from `[probe]` and `[selection]`
    pub fn selector_options(&self) -> SelectorOptions {
        SelectorOptions {
            probe_timeout: Duration::from_secs(self.probe.timeout_seconds),
            max_concurrent_probes: self.selection.max_concurrent_probes,
        }
    }

    /// Overall run budget, if configured
    pub fn deadline(&self) -> Option<Duration> {
        self.selection.deadline_seconds.map(Duration::from_secs)
    }

    /// Every configured provider, active or not, in file order
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .map(ProviderSettings::to_provider_config)
            .collect()
    }

    /// Base URL overrides keyed by provider
    pub fn base_url_overrides(&self) -> HashMap<ProviderId, String> {
        self.providers
            .iter()
            .filter_map(|p| p.base_url.clone().map(|url| (p.id, url)))
            .collect()
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
