//! Integration tests for the `llm-failover config` subcommand output
//!
//! The template is what new deployments start from, so it must load through
//! the same path as a hand-written config file.

use llm_failover::cli::generate_config_template;
use llm_failover::config::Config;
use llm_failover::{Policy, ProviderId};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create temporary directory for file operations
fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

#[test]
fn test_generated_template_creates_valid_config_file() {
    let temp_dir = create_temp_dir();
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, generate_config_template()).expect("Failed to write template");

    let config =
        Config::from_file(&config_path).expect("Generated template should load as valid Config");

    assert_eq!(config.providers.len(), 3);
    assert_eq!(config.probe.timeout_seconds, 10);
    assert_eq!(config.deadline(), Some(Duration::from_secs(60)));
    assert_eq!(config.selector_options().max_concurrent_probes, 1);
}

#[test]
fn test_template_policy_matches_builtin_priority() {
    let temp_dir = create_temp_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, generate_config_template()).unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let policy = config.policy().unwrap();

    assert_eq!(policy.priority(), Policy::builtin().priority());
    assert_eq!(
        policy.preferred_models(ProviderId::Gemini),
        ["gemini-2.5-flash", "gemini-2.0-flash"]
    );
    assert!(policy.preferred_models(ProviderId::Mistral).is_empty());
}

#[test]
fn test_template_inactive_provider_is_not_eligible() {
    let temp_dir = create_temp_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, generate_config_template()).unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let eligible: Vec<ProviderId> = config
        .provider_configs()
        .into_iter()
        .filter(|c| c.is_eligible())
        .map(|c| c.provider)
        .collect();

    assert_eq!(eligible, vec![ProviderId::OpenAi, ProviderId::Anthropic]);
}

#[test]
fn test_template_file_content_matches_generation() {
    let temp_dir = create_temp_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, generate_config_template()).unwrap();

    let content = fs::read_to_string(&config_path).unwrap();
    assert_eq!(content, generate_config_template());
}
