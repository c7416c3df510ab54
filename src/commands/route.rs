//! Route command - explain routing without calling any agent.

use anyhow::Result;
use clap::Args;
use counsel_agents::TopicGuardrail;
use counsel_config::CounselConfig;
use counsel_core::{Guardrail, GuardrailVerdict};
use counsel_routing::{Router, RoutingExplanation};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};

/// Arguments for the route command.
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Question to route
    pub query: String,
}

/// Table row for one agent.
#[derive(Debug, Tabled)]
pub struct RouteRow {
    #[tabled(rename = "Agent")]
    pub agent: String,
    #[tabled(rename = "Priority")]
    pub priority: u32,
    #[tabled(rename = "Score")]
    pub score: String,
    #[tabled(rename = "Confidence")]
    pub confidence: String,
    #[tabled(rename = "Matched")]
    pub matched: String,
    #[tabled(rename = "Role")]
    pub role: String,
}

/// Route result for output.
#[derive(Debug, Serialize)]
pub struct RouteOutput {
    #[serde(flatten)]
    pub explanation: RoutingExplanation,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<String>,
}

/// Explain routing for a query against the configured agents.
pub fn explain(query: &str, config: &CounselConfig) -> Result<RouteOutput> {
    let registry = config.build_registry()?;
    let router = Router::new(config.router.clone())?;
    let explanation = router.explain(query, &registry);

    let blocked = match TopicGuardrail::new(config.guardrail.clone()).check(query) {
        GuardrailVerdict::Allow => None,
        GuardrailVerdict::Block { reason, .. } => Some(reason),
    };

    Ok(RouteOutput {
        reasoning: explanation.reasoning(),
        explanation,
        blocked,
    })
}

/// Build table rows in ranking order of the explanation.
pub fn rows(explanation: &RoutingExplanation) -> Vec<RouteRow> {
    let primary = explanation.decision.primary();
    let secondaries: Vec<_> = explanation.decision.secondaries().collect();

    explanation
        .agents
        .iter()
        .map(|agent| {
            let role = if &agent.agent_id == primary {
                "primary"
            } else if secondaries.contains(&&agent.agent_id) {
                "secondary"
            } else {
                ""
            };
            RouteRow {
                agent: agent.label.clone(),
                priority: agent.priority,
                score: format!("{:.2}", agent.score),
                confidence: output::format_confidence(agent.confidence),
                matched: agent.matched_keywords.join(", "),
                role: role.to_string(),
            }
        })
        .collect()
}

/// Execute the route command.
pub fn execute(args: RouteArgs, config: &CounselConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let result = explain(&args.query, config)?;

    match format {
        OutputFormat::Json => output::json(&result),
        OutputFormat::Text => {
            output::section("Routing");
            output::key_value("Query", &result.explanation.query);
            output::key_value("Tokens", &result.explanation.tokens.join(" "));
            println!();
            output::table(&rows(&result.explanation));
            println!();
            output::info(&result.reasoning);
            if let Some(reason) = &result.blocked {
                output::warning(&format!("The guardrail would block this query ({reason})"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_cost_query() {
        let config = CounselConfig::default();
        let result = explain("How much does UC tuition cost?", &config).unwrap();
        assert_eq!(result.explanation.selected().as_str(), "financial_aid");
        assert!(result.blocked.is_none());
        assert!(result.reasoning.contains("financial_aid"));

        let rows = rows(&result.explanation);
        assert_eq!(rows.len(), 4);
        let primary: Vec<_> = rows.iter().filter(|r| r.role == "primary").collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].agent, "Financial Aid Specialist");
    }

    #[test]
    fn test_explain_reports_guardrail_block() {
        let config = CounselConfig::default();
        let result = explain("recommend a movie", &config).unwrap();
        assert_eq!(result.blocked.as_deref(), Some("off_topic"));
        assert_eq!(result.explanation.selected().as_str(), "coordinator");
    }
}
