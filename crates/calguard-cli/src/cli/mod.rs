//! CLI for the calguard reliability layer.

mod commands;

use anyhow::Result;
use calguard_core::config;
use calguard_core::FailureKind;
use clap::{Parser, Subcommand};

use commands::{run_backoff, run_config, run_simulate, SimulateOptions};

/// Top-level CLI for calguard.
#[derive(Debug, Parser)]
#[command(name = "calguard")]
#[command(about = "calguard: retry, pooling and call statistics for calendar providers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a synthetic workload against an in-memory provider and report call statistics.
    Simulate {
        /// Number of provider operations to issue.
        #[arg(long, default_value = "50", value_name = "N")]
        operations: usize,

        /// Probability (0..=1) that any single provider call fails.
        #[arg(long, default_value = "0.2", value_name = "P")]
        failure_rate: f64,

        /// Failure kind injected by the provider (e.g. transient-network, quota-exceeded).
        #[arg(long, default_value = "transient-network", value_parser = parse_kind)]
        kind: FailureKind,

        /// Artificial latency of every provider call, in milliseconds.
        #[arg(long, default_value = "5", value_name = "MS")]
        latency_ms: u64,

        /// Override the configured initial retry delay, in milliseconds.
        #[arg(long, value_name = "MS")]
        retry_delay_ms: Option<u64>,

        /// Print the report as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the retry wait schedule for a failure kind.
    Backoff {
        #[arg(long, default_value = "transient-network", value_parser = parse_kind)]
        kind: FailureKind,
    },

    /// Print the config file path and the effective configuration.
    Config,
}

fn parse_kind(name: &str) -> Result<FailureKind, String> {
    FailureKind::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = FailureKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown failure kind '{name}' (expected one of: {})", known.join(", "))
    })
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Simulate {
                operations,
                failure_rate,
                kind,
                latency_ms,
                retry_delay_ms,
                json,
            } => {
                let opts = SimulateOptions {
                    operations,
                    failure_rate,
                    kind,
                    latency_ms,
                    retry_delay_ms,
                };
                run_simulate(&cfg, opts, json).await?;
            }
            CliCommand::Backoff { kind } => run_backoff(&cfg, kind)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
