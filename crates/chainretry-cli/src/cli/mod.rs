//! CLI for the chainretry classifier and retry executor.

mod commands;

use anyhow::Result;
use chainretry_core::config;
use chainretry_core::retry::{ErrorClassification, RetryExecutor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::exit_code;
use commands::{run_classify, run_config, run_exec, run_schedule};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "chainretry")]
#[command(about = "Classify ledger call failures and run commands with classified retry", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/chainretry/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Classify a failure and show the retry policy it gets.
    Classify {
        /// Error message text.
        #[arg(long, short)]
        message: Option<String>,
        /// HTTP status code returned by the node or gateway.
        #[arg(long)]
        status: Option<u16>,
        /// System error code such as ECONNRESET.
        #[arg(long)]
        code: Option<String>,
    },

    /// Print the backoff schedule for a classification.
    Schedule {
        /// retriable, degraded or permanent.
        classification: ErrorClassification,
    },

    /// Run a command, retrying it according to how its failures classify.
    Exec {
        /// Operation name used in logs.
        #[arg(long, default_value = "exec")]
        name: String,
        /// Program and arguments (put them after `--`).
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show the config path and effective retry policies.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);
        let executor = RetryExecutor::from_config(&cfg)?;

        match cli.command {
            CliCommand::Classify {
                message,
                status,
                code,
            } => run_classify(&executor, message, status, code),
            CliCommand::Schedule { classification } => run_schedule(&executor, classification),
            CliCommand::Exec { name, command } => run_exec(&executor, &name, &command).await?,
            CliCommand::Config => {
                let path = match cli.config {
                    Some(path) => path,
                    None => config::config_path()?,
                };
                run_config(&executor, &path);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
