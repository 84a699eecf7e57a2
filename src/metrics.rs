//! Prometheus metrics for provider selection
//!
//! Tracks:
//! - Probe attempts by provider and outcome
//! - Probe latency by provider
//! - Successful selections by winning provider and fallback flag
//! - Terminal selection failures by kind
//!
//! The `fallback` label on `llm_failover_selections_total` is the signal to
//! alert on: a rising `fallback="true"` share means the primary vendors are
//! degraded.

use crate::error::SelectionError;
use crate::provider::ProviderId;
use crate::result::SelectionResult;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Probe outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Metrics collector for the selector
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    probe_attempts: IntCounterVec,
    probe_duration: HistogramVec,
    selections: IntCounterVec,
    selection_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 7 providers × 2 outcomes = 14 time series
        let probe_attempts = IntCounterVec::new(
            Opts::new(
                "llm_failover_probe_attempts_total",
                "Total provider probes by provider and outcome",
            ),
            &["provider", "outcome"],
        )?;

        let probe_duration = HistogramVec::new(
            HistogramOpts::new(
                "llm_failover_probe_duration_ms",
                "Probe latency in milliseconds, including timeouts",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            ]),
            &["provider"],
        )?;

        let selections = IntCounterVec::new(
            Opts::new(
                "llm_failover_selections_total",
                "Successful selections by winning provider and whether it was a fallback",
            ),
            &["provider", "fallback"],
        )?;

        let selection_failures = IntCounterVec::new(
            Opts::new(
                "llm_failover_selection_failures_total",
                "Terminal selection failures by kind",
            ),
            &["kind"],
        )?;

        registry.register(Box::new(probe_attempts.clone()))?;
        registry.register(Box::new(probe_duration.clone()))?;
        registry.register(Box::new(selections.clone()))?;
        registry.register(Box::new(selection_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            probe_attempts,
            probe_duration,
            selections,
            selection_failures,
        })
    }

    /// Record one completed probe
    pub fn record_probe(
        &self,
        provider: ProviderId,
        outcome: ProbeOutcome,
        latency: Duration,
    ) -> Result<(), prometheus::Error> {
        self.probe_attempts
            .get_metric_with_label_values(&[provider.as_str(), outcome.as_str()])?
            .inc();
        self.probe_duration
            .get_metric_with_label_values(&[provider.as_str()])?
            .observe(latency.as_secs_f64() * 1000.0);
        Ok(())
    }

    /// Record a successful selection
    pub fn record_selection(&self, result: &SelectionResult) -> Result<(), prometheus::Error> {
        let fallback = if result.fallback_used() {
            "true"
        } else {
            "false"
        };
        self.selections
            .get_metric_with_label_values(&[result.provider().as_str(), fallback])?
            .inc();
        Ok(())
    }

    /// Record a terminal selection failure
    pub fn record_selection_failure(&self, error: &SelectionError) -> Result<(), prometheus::Error> {
        self.selection_failures
            .get_metric_with_label_values(&[error.kind()])?
            .inc();
        Ok(())
    }

    /// Current value of the probe counter, for tests and diagnostics
    pub fn probe_count(&self, provider: ProviderId, outcome: ProbeOutcome) -> u64 {
        self.probe_attempts
            .get_metric_with_label_values(&[provider.as_str(), outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of the selection counter
    pub fn selection_count(&self, provider: ProviderId, fallback: bool) -> u64 {
        let fallback = if fallback { "true" } else { "false" };
        self.selections
            .get_metric_with_label_values(&[provider.as_str(), fallback])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of the failure counter for `kind`
    pub fn selection_failure_count(&self, kind: &str) -> u64 {
        self.selection_failures
            .get_metric_with_label_values(&[kind])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Gather all metrics and encode them in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_families.len(),
                "Prometheus text encoder failed"
            );
            e
        })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Prometheus encoder produced invalid UTF-8: {}", e))
        })
    }
}
