//! Command-line interface for llm-failover
//!
//! Provides argument parsing and subcommand handling for the llm-failover binary.

use clap::{Parser, Subcommand};

/// Request-time provider and model failover for hosted LLM APIs
#[derive(Parser)]
#[command(name = "llm-failover")]
#[command(version)]
#[command(about = "Request-time provider and model failover for hosted LLM APIs")]
#[command(
    long_about = "llm-failover probes configured LLM providers in policy order and reports \
    the first (provider, model) pair that accepts a live request, along with every \
    attempt made on the way."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one selection and print the chosen provider and model (default)
    Select {
        /// Print the result or failure as JSON
        #[arg(long)]
        json: bool,

        /// Print Prometheus metrics after the selection
        #[arg(long)]
        metrics: bool,
    },
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# llm-failover Configuration
# ==========================
#
# Providers are probed with one minimal live request each, in policy order.
# The first (provider, model) pair that answers with a success status wins.

# ─────────────────────────────────────────────────────────────────────────────
# PROBES
# ─────────────────────────────────────────────────────────────────────────────

[probe]
# Upper bound on a single probe request, in seconds (1-120)
timeout_seconds = 10

# ─────────────────────────────────────────────────────────────────────────────
# SELECTION
# ─────────────────────────────────────────────────────────────────────────────

[selection]
# Overall budget for one selection run, in seconds (1-600). Omit for no limit.
deadline_seconds = 60

# Probes in flight at once within a single provider's model list (1-16).
# 1 keeps the attempt order fully deterministic.
max_concurrent_probes = 1

# ─────────────────────────────────────────────────────────────────────────────
# POLICY (Optional)
# ─────────────────────────────────────────────────────────────────────────────
#
# Omit this section to use the builtin priority order and preferred models.
# Preferred models are tried first even if they are not listed under
# [[providers.models]]. Winning outside the first three priority slots is
# reported as fallback_used = true.

[policy]
priority = ["gemini", "openai", "anthropic", "groq", "mistral", "deepseek", "openrouter"]

[policy.preferred]
gemini = ["gemini-2.5-flash", "gemini-2.0-flash"]
openai = ["gpt-4o-mini"]
anthropic = ["claude-3-5-haiku-latest"]
groq = ["llama-3.3-70b-versatile"]

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# Provider fields:
#   - id: gemini, openai, anthropic, groq, mistral, deepseek, openrouter
#   - credential: "env:VAR_NAME" (read from environment), "plain:VALUE", or a raw key
#   - is_active: inactive providers are never probed (default true)
#   - base_url: optional override of the vendor API base URL
#
# Models listed here are tried only after every preferred model has failed.

[[providers]]
id = "openai"
credential = "env:OPENAI_API_KEY"

[[providers.models]]
name = "gpt-4o-mini"

[[providers.models]]
name = "gpt-3.5-turbo"
is_active = false

[[providers]]
id = "anthropic"
credential = "env:ANTHROPIC_API_KEY"

[[providers.models]]
name = "claude-3-5-haiku-latest"

[[providers]]
id = "groq"
credential = "env:GROQ_API_KEY"
is_active = false

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
"#
}
