//! llm-failover - request-time provider and model failover for hosted LLM APIs
//!
//! Picks a working (provider, model) pair for a downstream generation call by
//! probing configured candidates in policy order, so a single vendor outage,
//! revoked key, or retired model name never hard-fails the feature.

pub mod candidates;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod probe;
pub mod provider;
pub mod result;
pub mod selector;
pub mod telemetry;

pub use candidates::{
    CandidateSource, ConfigStore, CredentialDecryptor, ModelConfig, ProviderConfig, Secret,
};
pub use error::{AppError, AppResult, SelectionError};
pub use policy::Policy;
pub use probe::{ProbeAdapter, ProbeAttempt, ProbeRegistry, Prober};
pub use provider::{ModelId, ProviderId};
pub use result::{Phase, SelectionResult};
pub use selector::{Selector, SelectorOptions};
