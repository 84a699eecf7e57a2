//! Live provider probing
//!
//! A probe is one minimal, billable call against a (provider, model,
//! credential) tuple. Only the HTTP status matters: any success status means
//! the vendor authenticated the key and resolved the model name. Response
//! bodies are never parsed.
//!
//! Each vendor's request shape lives in its own adapter. Adapters are looked
//! up by [`ProviderId`] through [`ProbeRegistry`], a static dispatch table
//! built once at startup.

mod anthropic;
mod gemini;
mod openai_compat;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai_compat::OpenAiCompatibleAdapter;

use crate::candidates::Secret;
use crate::error::{AppError, AppResult, TransportError};
use crate::provider::{ModelId, ProviderId};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fixed prompt sent by every probe
pub const PROBE_PROMPT: &str = "ping";

/// Maximum characters of a vendor error body kept in an attempt's error string
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Maximum bytes read from a vendor error body
const MAX_ERROR_BODY_BYTES: usize = 1024;

/// Record of one completed probe
///
/// Immutable once created. Attempts are appended to a selection's log in
/// call order and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeAttempt {
    provider: ProviderId,
    model: ModelId,
    success: bool,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    latency: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ProbeAttempt {
    /// Record a successful probe
    pub fn success(provider: ProviderId, model: ModelId, latency: Duration) -> Self {
        Self {
            provider,
            model,
            success: true,
            latency,
            error: None,
        }
    }

    /// Record a failed probe with its reason
    pub fn failure(provider: ProviderId, model: ModelId, latency: Duration, error: String) -> Self {
        Self {
            provider,
            model,
            success: false,
            latency,
            error: Some(error),
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Failure reason, `None` for successful attempts
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Capability "attempt one test call" for a single vendor
#[async_trait]
pub trait ProbeAdapter: Send + Sync {
    /// Send the vendor's minimal request for `model` authenticated with `secret`
    ///
    /// `timeout` is passed down so adapters can set it on the HTTP request;
    /// [`Prober`] enforces it independently as a hard upper bound.
    async fn test_call(
        &self,
        model: &str,
        secret: &Secret,
        timeout: Duration,
    ) -> Result<(), TransportError>;
}

/// Dispatch table from provider to its probe adapter
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProbeAdapter>>,
}

impl ProbeRegistry {
    /// Empty registry, populated with [`ProbeRegistry::with_adapter`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the HTTP adapter for every [`ProviderId`]
    ///
    /// `base_urls` overrides the vendor's public base URL per provider.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the shared HTTP client cannot be built.
    pub fn standard(base_urls: &HashMap<ProviderId, String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let mut registry = Self::new();
        for provider in ProviderId::ALL {
            let base_url = base_urls
                .get(&provider)
                .cloned()
                .unwrap_or_else(|| provider.default_base_url().to_string());

            let adapter: Arc<dyn ProbeAdapter> = match provider {
                ProviderId::Gemini => Arc::new(GeminiAdapter::new(client.clone(), base_url)),
                ProviderId::Anthropic => {
                    Arc::new(AnthropicAdapter::new(client.clone(), base_url))
                }
                ProviderId::OpenAi
                | ProviderId::Groq
                | ProviderId::Mistral
                | ProviderId::DeepSeek
                | ProviderId::OpenRouter => {
                    Arc::new(OpenAiCompatibleAdapter::new(client.clone(), base_url))
                }
            };
            registry.adapters.insert(provider, adapter);
        }

        tracing::debug!(
            adapters = registry.adapters.len(),
            overrides = base_urls.len(),
            "Probe registry initialized"
        );

        Ok(registry)
    }

    /// Register (or replace) the adapter for `provider`
    pub fn with_adapter(mut self, provider: ProviderId, adapter: Arc<dyn ProbeAdapter>) -> Self {
        self.adapters.insert(provider, adapter);
        self
    }

    /// Adapter registered for `provider`
    pub fn get(&self, provider: ProviderId) -> Option<&Arc<dyn ProbeAdapter>> {
        self.adapters.get(&provider)
    }
}

/// Runs probes through the registry with a hard per-probe timeout
#[derive(Clone)]
pub struct Prober {
    registry: ProbeRegistry,
}

impl Prober {
    pub fn new(registry: ProbeRegistry) -> Self {
        Self { registry }
    }

    /// Probe `(provider, model)` once and record the outcome
    ///
    /// Never fails: transport errors, vendor rejections, an elapsed timeout,
    /// and a missing adapter all become a failed [`ProbeAttempt`].
    pub async fn probe(
        &self,
        provider: ProviderId,
        model: &str,
        secret: &Secret,
        timeout: Duration,
    ) -> ProbeAttempt {
        let started = Instant::now();

        let Some(adapter) = self.registry.get(provider) else {
            tracing::error!(
                provider = %provider,
                model = %model,
                "No probe adapter registered for provider"
            );
            return ProbeAttempt::failure(
                provider,
                model.to_string(),
                started.elapsed(),
                format!("no probe adapter registered for {}", provider),
            );
        };

        let outcome = match tokio::time::timeout(timeout, adapter.test_call(model, secret, timeout))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };
        let latency = started.elapsed();

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    provider = %provider,
                    model = %model,
                    latency_ms = latency.as_millis() as u64,
                    "Probe succeeded"
                );
                ProbeAttempt::success(provider, model.to_string(), latency)
            }
            Err(e) => {
                tracing::debug!(
                    provider = %provider,
                    model = %model,
                    latency_ms = latency.as_millis() as u64,
                    error = %e,
                    "Probe failed"
                );
                ProbeAttempt::failure(provider, model.to_string(), latency, e.to_string())
            }
        }
    }
}

/// Send a prepared probe request and map the outcome
///
/// Shared by every HTTP adapter: success status → `Ok`, anything else → the
/// matching [`TransportError`]. The body is only read on failure, and only to
/// enrich the error message.
pub(crate) async fn send_probe(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<(), TransportError> {
    let response = request.timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(e.to_string())
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = read_body_prefix(response, MAX_ERROR_BODY_BYTES).await;
    Err(TransportError::Http {
        status: status.as_u16(),
        body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
    })
}

/// Read at most `limit` bytes of a response body, lossily decoded
///
/// Stops at the first chunk past the limit; the rest of the body is never
/// pulled off the wire. Read errors end the prefix early.
async fn read_body_prefix(mut response: reqwest::Response, limit: usize) -> String {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Truncate to at most `max` characters without splitting a UTF-8 sequence
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
