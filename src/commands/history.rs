//! History command - show stored turns of a session.

use anyhow::Result;
use clap::Args;
use counsel_config::CounselConfig;
use counsel_core::{NoopTracer, SessionId, Turn};
use std::sync::Arc;
use tabled::Tabled;

use crate::bootstrap;
use crate::output::{self, OutputFormat};

/// Arguments for the history command.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Session identifier
    pub session: String,

    /// Number of most recent turns to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Print full responses instead of a table
    #[arg(long)]
    pub full: bool,
}

/// Table row for one turn.
#[derive(Debug, Tabled)]
pub struct TurnRow {
    #[tabled(rename = "#")]
    pub sequence_no: u64,
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "Query")]
    pub query: String,
    #[tabled(rename = "Agents")]
    pub agents: String,
    #[tabled(rename = "Response")]
    pub response: String,
}

impl From<&Turn> for TurnRow {
    fn from(turn: &Turn) -> Self {
        let agents = if turn.is_blocked() {
            "(blocked)".to_string()
        } else {
            turn.invocations
                .iter()
                .map(|i| format!("{} [{}]", i.agent_id, i.served_by))
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            sequence_no: turn.sequence_no,
            time: output::format_timestamp(turn.created_at),
            query: output::truncate(&turn.query, 40),
            agents,
            response: output::truncate(&turn.response, 60),
        }
    }
}

/// Execute the history command.
pub async fn execute(args: HistoryArgs, config: &CounselConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let store = bootstrap::build_session_store(&config.session, Arc::new(NoopTracer)).await;
    if !store.is_persistent() {
        output::warning("Session persistence is off, nothing is stored between runs");
    }

    let session_id = SessionId::new(args.session);
    let turns = store.history(&session_id, args.limit).await;

    match format {
        OutputFormat::Json => output::json(&turns),
        OutputFormat::Text if turns.is_empty() => {
            output::info(&format!("No turns stored for session {session_id}"));
            Ok(())
        }
        OutputFormat::Text if args.full => {
            for turn in &turns {
                output::section(&format!(
                    "[{}] {}",
                    turn.sequence_no,
                    output::format_timestamp(turn.created_at)
                ));
                output::key_value("Query", &turn.query);
                println!("\n{}", turn.response);
            }
            Ok(())
        }
        OutputFormat::Text => {
            output::table(&turns.iter().map(TurnRow::from).collect::<Vec<_>>());
            Ok(())
        }
    }
}
