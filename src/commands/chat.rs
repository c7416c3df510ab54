//! Chat command - interactive counseling session.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use counsel_config::CounselConfig;
use counsel_core::{AgentId, SessionId, UserId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use crate::bootstrap::Runtime;
use crate::commands::ask::AskOutput;
use crate::output::{self, OutputFormat};

const HISTORY_SHOWN: usize = 5;

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// User identifier stored with the session
    #[arg(short, long)]
    pub user: Option<String>,

    /// Session to continue (a new one is created if omitted)
    #[arg(short, long)]
    pub session: Option<String>,
}

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    /// Nothing typed
    Empty,
    /// End the session
    Quit,
    /// Show recent turns
    History,
    /// Show breaker and session statistics
    Stats,
    /// Show commands
    Help,
    /// A question for the agents
    Query(&'a str),
}

impl<'a> Input<'a> {
    /// Classify a line; commands are case-insensitive
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "quit" | "exit" | "bye" => Self::Quit,
            "history" => Self::History,
            "stats" => Self::Stats,
            "help" => Self::Help,
            _ => Self::Query(line),
        }
    }
}

/// Session summary printed on exit.
#[derive(Debug, Default, Serialize)]
pub struct ChatSummary {
    pub session_id: String,
    pub questions: usize,
    pub agents_consulted: BTreeSet<String>,
    pub fallback_answers: usize,
}

impl ChatSummary {
    fn record(&mut self, result: &AskOutput) {
        if result.blocked {
            return;
        }
        self.questions += 1;
        for line in &result.agents {
            self.agents_consulted.insert(line.agent.clone());
            if line.served_by == "fallback" {
                self.fallback_answers += 1;
            }
        }
    }
}

/// Execute the chat command.
pub async fn execute(args: ChatArgs, config: &CounselConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let runtime = Runtime::build(config).await?;
    let session_id = args.session.map_or_else(SessionId::generate, SessionId::new);
    let user_id = args.user.map(UserId::new);

    let mut summary = ChatSummary {
        session_id: session_id.to_string(),
        ..ChatSummary::default()
    };

    if format == OutputFormat::Text {
        println!("{}", "UC/CSU Transfer Counseling".bold());
        println!("Session {}. Type 'help' for commands, 'quit' to leave.", session_id.short());
    }

    let stdin = io::stdin();
    loop {
        if format == OutputFormat::Text {
            print!("\n{} ", "You:".green().bold());
            io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match Input::parse(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => print_help(),
            Input::History => print_history(&runtime, &session_id, format).await?,
            Input::Stats => print_stats(&runtime, format).await?,
            Input::Query(query) => {
                let spinner = (format == OutputFormat::Text).then(|| output::spinner("Thinking..."));
                let outcome = runtime
                    .coordinator
                    .process(query, &session_id, user_id.as_ref())
                    .await;
                if let Some(spinner) = spinner {
                    spinner.finish_and_clear();
                }

                let result = AskOutput::from(&outcome?);
                summary.record(&result);
                match format {
                    OutputFormat::Json => output::json(&result)?,
                    OutputFormat::Text => print_reply(&result),
                }
            }
        }
    }

    match format {
        OutputFormat::Json => output::json(&summary),
        OutputFormat::Text => {
            print_summary(&summary);
            Ok(())
        }
    }
}

fn print_reply(result: &AskOutput) {
    let agents = result
        .agents
        .iter()
        .map(|line| AgentId::new(line.agent.as_str()).title_case())
        .collect::<Vec<_>>()
        .join(" + ");
    let speaker = if agents.is_empty() { "Counselor".to_string() } else { agents };
    println!("\n{} {}", format!("{speaker}:").blue().bold(), result.response);
}

fn print_help() {
    output::section("Commands");
    output::key_value("help", "show this message");
    output::key_value("history", "show recent questions and answers");
    output::key_value("stats", "show agent availability and session count");
    output::key_value("quit, exit, bye", "end the session");

    output::section("Try asking");
    println!("  How much does it cost to transfer to UC Berkeley?");
    println!("  When is the FAFSA deadline for transfer students?");
    println!("  Should I major in business at a UC or a CSU?");
    println!("  I'm struggling with calculus, what should I do?");
}

async fn print_history(runtime: &Runtime, session_id: &SessionId, format: OutputFormat) -> Result<()> {
    let turns = runtime
        .coordinator
        .sessions()
        .history(session_id, HISTORY_SHOWN)
        .await;

    if format == OutputFormat::Json {
        return output::json(&turns);
    }

    if turns.is_empty() {
        output::info("No questions asked yet");
        return Ok(());
    }

    output::section("Recent turns");
    for turn in &turns {
        println!("  {} {}", format!("[{}]", turn.sequence_no).dimmed(), turn.query);
        println!("      {}", output::truncate(&turn.response, 100));
    }
    Ok(())
}

async fn print_stats(runtime: &Runtime, format: OutputFormat) -> Result<()> {
    let breakers = runtime.coordinator.breakers().stats();
    let sessions = runtime.coordinator.sessions().stored_session_count().await;

    if format == OutputFormat::Json {
        return output::json(&serde_json::json!({
            "breakers": breakers,
            "sessions": sessions,
        }));
    }

    output::section("Agents");
    if breakers.is_empty() {
        println!("  (no agent called yet)");
    }
    for stats in &breakers {
        output::breaker_status(&stats.endpoint, &stats.state.to_string());
    }
    output::key_value("Sessions", &sessions.to_string());
    Ok(())
}

fn print_summary(summary: &ChatSummary) {
    output::section("Session summary");
    output::key_value("Session", &summary.session_id);
    output::key_value("Questions", &summary.questions.to_string());
    if !summary.agents_consulted.is_empty() {
        let agents = summary
            .agents_consulted
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        output::key_value("Agents consulted", &agents);
    }
    if summary.fallback_answers > 0 {
        output::key_value("Offline answers", &summary.fallback_answers.to_string());
    }
    output::success("Good luck with your transfer!");
}
