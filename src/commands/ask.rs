//! Ask command - answer a single question.

use anyhow::Result;
use clap::Args;
use counsel_agents::QueryOutcome;
use counsel_config::CounselConfig;
use counsel_core::{SessionId, UserId};
use serde::Serialize;

use crate::bootstrap::Runtime;
use crate::output::{self, OutputFormat};

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to ask
    pub query: String,

    /// Session to continue (a new one is created if omitted)
    #[arg(short, long)]
    pub session: Option<String>,

    /// User identifier stored with a new session
    #[arg(short, long)]
    pub user: Option<String>,

    /// Print the Prometheus exposition after the answer
    #[arg(long)]
    pub metrics: bool,
}

/// One agent's part in the answer.
#[derive(Debug, Serialize)]
pub struct AgentLine {
    pub agent: String,
    pub served_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub latency_ms: u64,
}

/// Answer for output.
#[derive(Debug, Serialize)]
pub struct AskOutput {
    pub response: String,
    pub agents: Vec<AgentLine>,
    pub confidence: f64,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_no: Option<u64>,
    pub blocked: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

impl From<&QueryOutcome> for AskOutput {
    fn from(outcome: &QueryOutcome) -> Self {
        Self {
            response: outcome.response.clone(),
            agents: agent_lines(outcome),
            confidence: outcome.confidence,
            session_id: outcome.session_id.to_string(),
            sequence_no: outcome.sequence_no,
            blocked: outcome.blocked,
            latency_ms: outcome.latency_ms,
            metrics: None,
        }
    }
}

/// Per-agent lines in invocation order
pub fn agent_lines(outcome: &QueryOutcome) -> Vec<AgentLine> {
    outcome
        .invocations
        .iter()
        .map(|i| AgentLine {
            agent: i.agent_id.to_string(),
            served_by: i.served_by.to_string(),
            failure: i.failure.map(|kind| kind.to_string()),
            latency_ms: i.latency_ms,
        })
        .collect()
}

/// Execute the ask command.
pub async fn execute(args: AskArgs, config: &CounselConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("query must not be empty");
    }

    let runtime = Runtime::build(config).await?;
    let session_id = args.session.map_or_else(SessionId::generate, SessionId::new);
    let user_id = args.user.map(UserId::new);

    let spinner = (format == OutputFormat::Text).then(|| output::spinner("Consulting agents..."));
    let outcome = runtime
        .coordinator
        .process(query, &session_id, user_id.as_ref())
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let outcome = outcome?;

    let mut result = AskOutput::from(&outcome);
    if args.metrics {
        runtime.publish_breakers();
        result.metrics = Some(runtime.metrics.render()?);
    }

    match format {
        OutputFormat::Json => output::json(&result),
        OutputFormat::Text => {
            print_outcome(&result);
            if let Some(metrics) = &result.metrics {
                output::section("Metrics");
                print!("{metrics}");
            }
            Ok(())
        }
    }
}

/// Print an answer followed by its routing summary.
pub fn print_outcome(result: &AskOutput) {
    println!("\n{}\n", result.response);

    if result.blocked {
        output::warning("Question was outside transfer counseling topics");
    } else {
        output::section("Agents");
        for line in &result.agents {
            let served = match &line.failure {
                Some(failure) => format!("{} ({failure})", line.served_by),
                None => line.served_by.clone(),
            };
            output::key_value(&line.agent, &format!("{served}, {}ms", line.latency_ms));
        }
        output::key_value("Confidence", &output::format_confidence(result.confidence));
    }

    output::key_value("Session", &result.session_id);
    if let Some(sequence_no) = result.sequence_no {
        output::key_value("Turn", &sequence_no.to_string());
    }
}
