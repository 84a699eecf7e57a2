//! Candidate source: live provider configuration and credentials
//!
//! Reads the configured providers fresh on every selection run, keeps only the
//! eligible ones, and turns stored credentials into secrets on demand. The
//! configuration store and the decryptor are external collaborators reached
//! through the [`ConfigStore`] and [`CredentialDecryptor`] traits.

use crate::error::{DecryptionError, StoreError};
use crate::provider::{ModelId, ProviderId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A model entry under a configured provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub model: ModelId,
    pub is_active: bool,
}

impl ModelConfig {
    pub fn new(model: impl Into<ModelId>, is_active: bool) -> Self {
        Self {
            model: model.into(),
            is_active,
        }
    }
}

/// Snapshot of one configured provider
///
/// `credential` is opaque and may be encrypted; only a [`CredentialDecryptor`]
/// interprets it.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub credential: Option<String>,
    pub is_active: bool,
    pub models: Vec<ModelConfig>,
}

impl ProviderConfig {
    /// Active and carrying a non-blank credential
    ///
    /// A provider without a credential is never eligible, whatever its
    /// activation flag says.
    pub fn is_eligible(&self) -> bool {
        self.is_active
            && self
                .credential
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
    }

    /// Configured models with `is_active = true`, in configured order
    pub fn active_models(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.iter().filter(|m| m.is_active)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field(
                "credential",
                &self.credential.as_ref().map(|_| "<redacted>"),
            )
            .field("is_active", &self.is_active)
            .field("models", &self.models)
            .finish()
    }
}

/// Decrypted credential
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Raw secret, for building auth headers only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// External store of provider configuration
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Every configured provider, active or not
    async fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>, StoreError>;
}

/// External credential decryptor
#[async_trait]
pub trait CredentialDecryptor: Send + Sync {
    async fn decrypt(&self, credential: &str) -> Result<Secret, DecryptionError>;
}

/// Filters live configuration and resolves credentials lazily
#[derive(Clone)]
pub struct CandidateSource {
    store: Arc<dyn ConfigStore>,
    decryptor: Arc<dyn CredentialDecryptor>,
}

impl CandidateSource {
    pub fn new(store: Arc<dyn ConfigStore>, decryptor: Arc<dyn CredentialDecryptor>) -> Self {
        Self { store, decryptor }
    }

    /// Fresh read of the store, filtered to eligible providers
    ///
    /// At most one entry per provider is returned: when the store lists a
    /// provider more than once, the first eligible entry wins and the rest are
    /// dropped with a warning. Nothing is cached between calls.
    pub async fn active_configs(&self) -> Result<Vec<ProviderConfig>, StoreError> {
        let all = self.store.list_provider_configs().await?;
        let total = all.len();

        let mut seen = HashSet::new();
        let mut active = Vec::new();
        for config in all.into_iter().filter(ProviderConfig::is_eligible) {
            if !seen.insert(config.provider) {
                tracing::warn!(
                    provider = %config.provider,
                    dropped_models = config.models.len(),
                    "Store returned a duplicate entry for provider; keeping the first"
                );
                continue;
            }
            active.push(config);
        }

        tracing::debug!(
            total_providers = total,
            eligible_providers = active.len(),
            "Loaded provider configuration"
        );

        Ok(active)
    }

    /// Decrypt the credential of `config`
    ///
    /// # Errors
    /// `DecryptionError::Empty` if the config carries no credential, otherwise
    /// whatever the decryptor reports.
    pub async fn resolve_credential(
        &self,
        config: &ProviderConfig,
    ) -> Result<Secret, DecryptionError> {
        let credential = config
            .credential
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(DecryptionError::Empty)?;
        self.decryptor.decrypt(credential).await
    }
}

/// Fixed in-memory snapshot of provider configuration
///
/// Backs the CLI (loaded from the TOML file) and tests. Returns every entry
/// regardless of activation, like any other store.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigStore {
    providers: Vec<ProviderConfig>,
}

impl StaticConfigStore {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl ConfigStore for StaticConfigStore {
    async fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>, StoreError> {
        Ok(self.providers.clone())
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves `env:NAME` credentials from the environment
///
/// - `env:NAME` → value of environment variable `NAME`
/// - `plain:VALUE` → `VALUE`
/// - anything else → used verbatim
#[derive(Clone)]
pub struct EnvCredentialDecryptor {
    lookup: EnvLookup,
}

impl EnvCredentialDecryptor {
    /// Decryptor reading the process environment
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Decryptor reading variables through `lookup` instead of the process environment
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

impl Default for EnvCredentialDecryptor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialDecryptor for EnvCredentialDecryptor {
    async fn decrypt(&self, credential: &str) -> Result<Secret, DecryptionError> {
        let credential = credential.trim();

        let value = if let Some(name) = credential.strip_prefix("env:") {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(DecryptionError::Malformed(format!(
                    "invalid environment variable name '{}'",
                    name
                )));
            }
            (self.lookup)(name).ok_or_else(|| DecryptionError::MissingEnv(name.to_string()))?
        } else if let Some(value) = credential.strip_prefix("plain:") {
            value.to_string()
        } else {
            credential.to_string()
        };

        if value.trim().is_empty() {
            return Err(DecryptionError::Empty);
        }

        Ok(Secret::new(value))
    }
}
