//! llm-failover command-line binary
//!
//! Runs one selection against the providers in the config file and reports
//! the winner, or the failure with every attempt made.

use clap::Parser;
use llm_failover::cli::{Cli, Command, generate_config_template};
use llm_failover::config::Config;
use llm_failover::metrics::Metrics;
use llm_failover::{Selector, SelectionError, SelectionResult, telemetry};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (json, print_metrics) = match cli.command {
        Some(Command::Config { output }) => {
            let template = generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Wrote configuration template to {}", path);
                }
                None => print!("{}", template),
            }
            return Ok(ExitCode::SUCCESS);
        }
        Some(Command::Select { json, metrics }) => (json, metrics),
        None => (false, false),
    };

    // Load configuration
    let config = Config::from_file(&cli.config)?;

    // Initialize telemetry
    telemetry::init(&config.observability.log_level);

    let policy = config.policy()?;
    let metrics = Arc::new(Metrics::new()?);
    let selector = Selector::from_config(&config)?.with_metrics(metrics.clone());

    tracing::info!(
        config = %cli.config,
        providers = config.providers.len(),
        probe_timeout_seconds = config.probe.timeout_seconds,
        "Starting provider selection"
    );

    // Ctrl-C cancels the run; completed attempts are still reported
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling selection");
            ctrl_c_token.cancel();
        }
    });

    let deadline = config
        .deadline()
        .map(|budget| tokio::time::Instant::now() + budget);

    let outcome = selector.select(&policy, &cancel, deadline).await;

    let exit = match &outcome {
        Ok(result) => {
            print_success(result, json)?;
            ExitCode::SUCCESS
        }
        Err(error) => {
            print_failure(error, json)?;
            ExitCode::FAILURE
        }
    };

    if print_metrics {
        print!("{}", metrics.gather()?);
    }

    Ok(exit)
}

fn print_success(result: &SelectionResult, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("{}/{}", result.provider(), result.model());
    if result.fallback_used() {
        println!("fallback used: primary providers failed");
    }
    for attempt in result.attempts() {
        print_attempt_line(attempt);
    }
    Ok(())
}

fn print_failure(error: &SelectionError, json: bool) -> Result<(), serde_json::Error> {
    if json {
        let body = serde_json::json!({
            "error": error.to_string(),
            "kind": error.kind(),
            "attempts": error.attempts(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    eprintln!("error: {}", error);
    for attempt in error.attempts() {
        print_attempt_line(attempt);
    }
    Ok(())
}

fn print_attempt_line(attempt: &llm_failover::ProbeAttempt) {
    let status = if attempt.is_success() { "ok" } else { "failed" };
    let reason = attempt.error().unwrap_or("");
    eprintln!(
        "  {:<10} {:<32} {:>6}ms  {} {}",
        attempt.provider().as_str(),
        attempt.model(),
        attempt.latency().as_millis(),
        status,
        reason
    );
}
