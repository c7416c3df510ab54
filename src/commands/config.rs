//! Config command - inspect and validate configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use counsel_config::ConfigLoader;
use serde::Serialize;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration with secrets redacted
    Show,

    /// Load and validate the configuration
    Validate,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    agents: usize,
    provider: String,
    persistence: bool,
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, loader: &ConfigLoader, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    match args.command {
        ConfigCommand::Show => {
            let config = loader.load()?;
            let value = config.redacted()?;
            match format {
                OutputFormat::Json => output::json(&value),
                OutputFormat::Text => {
                    print!("{}", serde_yaml::to_string(&value)?);
                    Ok(())
                }
            }
        }
        ConfigCommand::Validate => {
            let path = loader.resolve_path().map(|p| p.display().to_string());
            match loader.load() {
                Ok(config) => {
                    let summary = ValidateOutput {
                        path,
                        agents: config.agents.profiles.len(),
                        provider: if config.uses_network() {
                            config.provider.model.clone()
                        } else {
                            "offline".to_string()
                        },
                        persistence: config.session.persistence,
                    };
                    match format {
                        OutputFormat::Json => CommandResult::success(summary).print(format),
                        OutputFormat::Text => {
                            output::success("Configuration is valid");
                            output::key_value(
                                "File",
                                summary.path.as_deref().unwrap_or("(defaults)"),
                            );
                            output::key_value("Agents", &summary.agents.to_string());
                            output::key_value("Provider", &summary.provider);
                            output::key_value(
                                "Persistence",
                                if summary.persistence { "sqlite" } else { "memory" },
                            );
                            Ok(())
                        }
                    }
                }
                Err(err) => {
                    CommandResult::<()>::failure(err.to_string()).print(format)?;
                    Err(err.into())
                }
            }
        }
    }
}
