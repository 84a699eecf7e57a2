//! Error types for llm-failover
//!
//! Per-attempt failures (`TransportError`, `DecryptionError`) never escape the
//! selector; they are folded into the attempts log. `SelectionError` is the
//! terminal outcome of a selection run and always carries the attempts made so
//! far. `AppError` covers configuration and the command-line surface.

use crate::probe::ProbeAttempt;
use thiserror::Error;

/// Outcome of a single vendor test call that did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Vendor answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS, or protocol failure before a status was received
    #[error("network error: {0}")]
    Network(String),

    /// Per-probe timeout elapsed
    #[error("timeout")]
    Timeout,
}

/// Stored credential could not be turned into a usable secret
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("credential is empty")]
    Empty,

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("malformed credential: {0}")]
    Malformed(String),
}

/// Configuration store could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("configuration store unavailable: {0}")]
pub struct StoreError(pub String);

/// Terminal failure of a selection run
#[derive(Error, Debug, Clone)]
pub enum SelectionError {
    /// No provider is both active and credentialed; nothing was probed
    #[error("No providers configured: no active provider has a credential")]
    NoProvidersConfigured { attempts: Vec<ProbeAttempt> },

    /// Every eligible candidate across both phases failed
    #[error("No provider available: all {} attempted candidates failed", attempts.len())]
    NoProviderAvailable { attempts: Vec<ProbeAttempt> },

    /// Caller cancelled the run or its deadline elapsed
    #[error("Selection cancelled after {} completed attempts", attempts.len())]
    Cancelled { attempts: Vec<ProbeAttempt> },

    /// The configuration store itself failed, so no candidates are known
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SelectionError {
    /// Attempts log collected before the run terminated
    pub fn attempts(&self) -> &[ProbeAttempt] {
        match self {
            Self::NoProvidersConfigured { attempts }
            | Self::NoProviderAvailable { attempts }
            | Self::Cancelled { attempts } => attempts,
            Self::Store(_) => &[],
        }
    }

    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoProvidersConfigured { .. } => "no_providers_configured",
            Self::NoProviderAvailable { .. } => "no_provider_available",
            Self::Cancelled { .. } => "cancelled",
            Self::Store(_) => "store",
        }
    }
}

/// Main error type for configuration loading and the CLI
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
