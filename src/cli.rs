//! CLI argument definitions using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use counsel_config::{ConfigLoader, TelemetrySettings};
use std::path::PathBuf;

use crate::bootstrap;
use crate::commands;

/// Transfer Counsel - routes UC/CSU transfer questions to specialist agents
#[derive(Parser, Debug)]
#[command(name = "counsel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (YAML or TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question
    Ask(commands::ask::AskArgs),

    /// Start an interactive counseling session
    Chat(commands::chat::ChatArgs),

    /// Explain how a question would be routed
    Route(commands::route::RouteArgs),

    /// Show stored turns of a session
    History(commands::history::HistoryArgs),

    /// Manage stored sessions
    Sessions(commands::sessions::SessionsArgs),

    /// Show or validate the effective configuration
    Config(commands::config::ConfigArgs),
}

impl Cli {
    fn loader(&self) -> ConfigLoader {
        match &self.config {
            Some(path) => ConfigLoader::new().with_path(path),
            None => ConfigLoader::new(),
        }
    }

    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let loader = self.loader();

        // Config commands report load errors themselves
        if let Commands::Config(args) = self.command {
            let tracing = bootstrap::tracing_config(&TelemetrySettings::default(), self.verbose, false);
            counsel_telemetry::init_logging(&tracing.logging)?;
            return commands::config::execute(args, &loader, self.json);
        }

        let config = loader.load()?;
        let provider = counsel_telemetry::init_tracing(&bootstrap::tracing_config(
            &config.telemetry,
            self.verbose,
            false,
        ))?;

        let result = match self.command {
            Commands::Ask(args) => commands::ask::execute(args, &config, self.json).await,
            Commands::Chat(args) => commands::chat::execute(args, &config, self.json).await,
            Commands::Route(args) => commands::route::execute(args, &config, self.json),
            Commands::History(args) => commands::history::execute(args, &config, self.json).await,
            Commands::Sessions(args) => commands::sessions::execute(args, &config, self.json).await,
            Commands::Config(_) => Ok(()),
        };

        counsel_telemetry::shutdown_tracing(provider);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "counsel", "-vv", "--json", "ask", "How much is tuition?", "--session", "s1", "--metrics",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.query, "How much is tuition?");
                assert_eq!(args.session.as_deref(), Some("s1"));
                assert!(args.metrics);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_sessions_cleanup() {
        let cli = Cli::try_parse_from(["counsel", "sessions", "cleanup", "--older-than", "2h"]).unwrap();
        match cli.command {
            Commands::Sessions(args) => match args.command {
                commands::sessions::SessionsCommand::Cleanup { older_than } => {
                    assert_eq!(
                        older_than.map(Into::into),
                        Some(std::time::Duration::from_secs(7200))
                    );
                }
                commands::sessions::SessionsCommand::Count => panic!("expected cleanup"),
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["counsel", "config", "validate", "--config", "alt.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    }
}
