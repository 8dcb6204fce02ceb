// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! crmbridge - webhook and sync bridge between a business application,
//! Chatwoot, and Formbricks.
//!
//! This is the binary entry point. `serve` runs the HTTP gateway; the other
//! subcommands are one-shot jobs meant for cron or systemd timers.

mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use crmbridge_config::CrmBridgeConfig;
use crmbridge_core::BridgeError;

/// crmbridge - keeps chat, surveys, and CRM records in step.
#[derive(Parser, Debug)]
#[command(name = "crmbridge", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Register webhooks as configured, then serve until interrupted.
    Serve,
    /// Pull Chatwoot contacts and apply the contact policy.
    SyncContacts,
    /// Pull Formbricks survey definitions.
    SyncSurveys,
    /// Delete resolved conversations past the retention period.
    SweepConversations,
    /// Register the webhooks of every enabled integration.
    RegisterWebhooks,
    /// Check the credentials of one integration.
    TestConnection {
        #[arg(value_enum)]
        service: Service,
    },
    /// Convert a Lead into a Customer.
    ConvertLead {
        /// Local record name of the Lead.
        name: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Service {
    Chatwoot,
    Formbricks,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => crmbridge_config::load_and_validate_path(path),
        None => crmbridge_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            crmbridge_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging.level);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: CrmBridgeConfig) -> Result<(), BridgeError> {
    if let Commands::Serve = command {
        return serve::run_serve(config).await;
    }

    let bridge = commands::Bridge::open(&config).await?;
    let result = match command {
        Commands::Serve => Ok(()),
        Commands::SyncContacts => bridge.sync_contacts().await,
        Commands::SyncSurveys => bridge.sync_surveys().await,
        Commands::SweepConversations => bridge.sweep_conversations().await,
        Commands::RegisterWebhooks => bridge.register_webhooks(&config.server).await,
        Commands::TestConnection { service } => bridge.test_connection(service).await,
        Commands::ConvertLead { name } => bridge.convert_lead(&name).await,
    };
    bridge.close().await;
    result
}

/// Installs the fmt subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crmbridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["crmbridge", "test-connection", "formbricks"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::TestConnection {
                service: Service::Formbricks
            }
        ));

        let cli = Cli::try_parse_from([
            "crmbridge",
            "--config",
            "/tmp/c.toml",
            "convert-lead",
            "LEAD-1",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::ConvertLead { ref name } if name == "LEAD-1"));

        assert!(Cli::try_parse_from(["crmbridge", "test-connection", "slack"]).is_err());
    }
}
