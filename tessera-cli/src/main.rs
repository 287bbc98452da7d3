//! Tessera operator CLI
//!
//! Inspects keys and resolved policies, and runs bulk evictions and health
//! probes against the configured Redis tier.
//!
//! Usage: tessera [--json-logs] <command> [args]

mod args;
mod commands;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tessera_core::{CacheConfig, RedisConfig, TesseraError};
use thiserror::Error;

use args::{Cli, Command};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Setup(String),

    #[error(transparent)]
    Tessera(#[from] TesseraError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_tracing(cli.json_logs) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = Arc::new(CacheConfig::from_env().map_err(TesseraError::from)?);
    config.validate().map_err(TesseraError::from)?;

    match cli.command {
        Command::Inspect { keys } => {
            let (output, malformed) = commands::inspect(&config, &keys);
            print_json(&output)?;
            Ok(if malformed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Policy { namespaces } => {
            print_json(&commands::policy(config, &namespaces))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Shard { keys } => {
            print_json(&commands::shard(&config, &keys))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Evict(evict) => {
            let cache = commands::redis_cache(config, &RedisConfig::from_env())?;
            let output =
                commands::evict(&cache, &evict.tenant, evict.org.as_deref(), &evict.target())
                    .await?;
            let complete = output["complete"].as_bool().unwrap_or(false);
            print_json(&output)?;
            Ok(if complete {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Health => {
            let cache = commands::redis_cache(config, &RedisConfig::from_env())?;
            let (output, healthy) = commands::health(&cache).await?;
            print_json(&output)?;
            Ok(if healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
