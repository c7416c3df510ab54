//! Sessions command - maintain stored sessions.

use anyhow::Result;
use clap::{Args, Subcommand};
use counsel_config::CounselConfig;
use counsel_core::NoopTracer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the sessions command.
#[derive(Args, Debug)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// Remove sessions idle for longer than a duration
    Cleanup {
        /// Idle time, e.g. "30m" or "7days" (defaults to session.cleanup_after)
        #[arg(long)]
        older_than: Option<humantime::Duration>,
    },

    /// Count stored sessions
    Count,
}

#[derive(Debug, Serialize)]
struct CleanupOutput {
    removed: usize,
    #[serde(with = "humantime_serde")]
    older_than: Duration,
}

/// Execute the sessions command.
pub async fn execute(args: SessionsArgs, config: &CounselConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let store = bootstrap::build_session_store(&config.session, Arc::new(NoopTracer)).await;

    match args.command {
        SessionsCommand::Cleanup { older_than } => {
            let older_than = older_than.map_or(config.session.cleanup_after, Into::into);
            let removed = store.cleanup_inactive(older_than).await;

            match format {
                OutputFormat::Json => {
                    CommandResult::success(CleanupOutput { removed, older_than }).print(format)
                }
                OutputFormat::Text => {
                    output::success(&format!(
                        "Removed {removed} session(s) idle for more than {}",
                        output::format_duration(older_than)
                    ));
                    Ok(())
                }
            }
        }
        SessionsCommand::Count => {
            let count = store.stored_session_count().await;
            match format {
                OutputFormat::Json => output::json(&serde_json::json!({ "sessions": count })),
                OutputFormat::Text => {
                    output::key_value("Stored sessions", &count.to_string());
                    Ok(())
                }
            }
        }
    }
}
