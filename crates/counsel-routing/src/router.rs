//! Weighted keyword router.
//!
//! Scoring and selection:
//! - an agent's score is the sum of weights of its matched keywords
//! - confidence is the agent's share of the total positive score
//! - the primary is the highest score; ties go to the lower priority rank,
//!   then the lower agent id
//! - secondaries are other positive-scoring agents within `epsilon` of the
//!   primary, in the same order, capped at `max_secondaries`
//! - when nothing scores, the registry's general agent is primary with
//!   confidence 0

use crate::explain::{AgentExplanation, RoutingExplanation};
use crate::matcher::QueryTokens;
use counsel_core::{AgentProfile, AgentScore, ConfigError, ProfileRegistry, RouteDecision};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Router configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Maximum score gap between primary and a secondary
    pub epsilon: f64,
    /// Maximum number of secondary agents
    pub max_secondaries: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            max_secondaries: 2,
        }
    }
}

impl RouterConfig {
    /// Set epsilon
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the secondary cap
    #[must_use]
    pub fn with_max_secondaries(mut self, max: usize) -> Self {
        self.max_secondaries = max;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigError::invalid(
                "router.epsilon",
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

struct Candidate<'a> {
    profile: &'a AgentProfile,
    score: f64,
    matched: Vec<String>,
}

fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.profile.priority.cmp(&b.profile.priority))
        .then_with(|| a.profile.id.cmp(&b.profile.id))
}

/// Pure, deterministic query router
#[derive(Debug, Clone, Default)]
pub struct Router {
    config: RouterConfig,
}

impl Router {
    /// Create a router with a validated configuration
    pub fn new(config: RouterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Router configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn candidates<'a>(tokens: &QueryTokens, registry: &'a ProfileRegistry) -> Vec<Candidate<'a>> {
        registry
            .profiles()
            .iter()
            .map(|profile| {
                let mut score = 0.0;
                let mut matched = Vec::new();
                for keyword in &profile.keywords {
                    if tokens.contains(&keyword.phrase) {
                        score += keyword.weight;
                        matched.push(keyword.phrase.clone());
                    }
                }
                Candidate {
                    profile,
                    score,
                    matched,
                }
            })
            .collect()
    }

    fn to_score(candidate: &Candidate<'_>, total: f64) -> AgentScore {
        let confidence = if total > 0.0 {
            (candidate.score / total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        AgentScore::new(candidate.profile.id.clone(), candidate.score, confidence)
            .with_matched(candidate.matched.clone())
    }

    fn decide(&self, mut candidates: Vec<Candidate<'_>>, registry: &ProfileRegistry) -> RouteDecision {
        let total: f64 = candidates
            .iter()
            .map(|c| c.score)
            .filter(|s| *s > 0.0)
            .sum();

        candidates.retain(|c| c.score > 0.0);
        candidates.sort_by(rank);

        let Some((primary, rest)) = candidates.split_first() else {
            return RouteDecision::new(
                AgentScore::new(registry.general_agent().clone(), 0.0, 0.0),
                Vec::new(),
            );
        };

        let secondaries = rest
            .iter()
            .filter(|c| primary.score - c.score <= self.config.epsilon)
            .take(self.config.max_secondaries)
            .map(|c| Self::to_score(c, total))
            .collect();

        RouteDecision::new(Self::to_score(primary, total), secondaries)
    }

    /// Route a query over the registry
    pub fn route(&self, query: &str, registry: &ProfileRegistry) -> RouteDecision {
        let tokens = QueryTokens::new(query);
        let decision = self.decide(Self::candidates(&tokens, registry), registry);

        debug!(
            primary = %decision.primary(),
            secondaries = decision.len() - 1,
            confidence = decision.confidence(),
            "Routed query"
        );

        decision
    }

    /// Explain how a query would be routed
    pub fn explain(&self, query: &str, registry: &ProfileRegistry) -> RoutingExplanation {
        let tokens = QueryTokens::new(query);
        let candidates = Self::candidates(&tokens, registry);
        let total: f64 = candidates
            .iter()
            .map(|c| c.score)
            .filter(|s| *s > 0.0)
            .sum();

        let agents = candidates
            .iter()
            .map(|c| AgentExplanation {
                agent_id: c.profile.id.clone(),
                label: c.profile.label.clone(),
                priority: c.profile.priority,
                score: c.score,
                confidence: Self::to_score(c, total).confidence,
                matched_keywords: c.matched.clone(),
            })
            .collect();

        let decision = self.decide(candidates, registry);

        RoutingExplanation {
            query: query.to_string(),
            tokens: tokens.tokens().to_vec(),
            agents,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::AgentId;

    fn registry() -> ProfileRegistry {
        ProfileRegistry::new(
            vec![
                AgentProfile::new("financial_aid", "Financial Aid Specialist")
                    .with_priority(1)
                    .with_keywords(["cost", "tuition", "fafsa", "cal grant"], 1.0),
                AgentProfile::new("course_difficulty", "Course Difficulty Advisor")
                    .with_priority(2)
                    .with_keywords(["calculus", "course", "transfer", "classes"], 1.0),
                AgentProfile::new("career_counselor", "Career Counselor")
                    .with_priority(3)
                    .with_keywords(["major", "career", "salary", "computer science"], 1.0),
                AgentProfile::new("coordinator", "Transfer Coordinator").with_priority(10),
            ],
            "coordinator",
        )
        .unwrap()
    }

    fn ids(decision: &RouteDecision) -> Vec<&str> {
        decision.agents().map(AgentId::as_str).collect()
    }

    #[test]
    fn test_single_agent_routing() {
        let router = Router::default();
        let decision = router.route("How much does UC Berkeley cost?", &registry());
        assert_eq!(ids(&decision), vec!["financial_aid"]);
        assert!((decision.confidence() - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.evidence(&AgentId::new("financial_aid")), ["cost".to_string()]);
    }

    #[test]
    fn test_multi_agent_within_epsilon() {
        let router = Router::default();
        let decision = router.route("compare salary and tuition for CS majors", &registry());
        assert_eq!(ids(&decision), vec!["career_counselor", "financial_aid"]);
        let primary = decision.confidence();
        let secondary = decision.confidence_for(&AgentId::new("financial_aid")).unwrap();
        assert!((primary - 2.0 / 3.0).abs() < 1e-9);
        assert!((secondary - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_epsilon_excludes_distant_agents() {
        let router = Router::new(RouterConfig::default().with_epsilon(0.5)).unwrap();
        let decision = router.route("compare salary and tuition for CS majors", &registry());
        assert_eq!(ids(&decision), vec!["career_counselor"]);
    }

    #[test]
    fn test_ties_break_on_priority() {
        let router = Router::default();
        let decision = router.route("tuition for calculus", &registry());
        assert_eq!(ids(&decision), vec!["financial_aid", "course_difficulty"]);
    }

    #[test]
    fn test_ties_break_on_id_when_priority_equal() {
        let registry = ProfileRegistry::new(
            vec![
                AgentProfile::new("zeta", "Zeta").with_keyword("alpha", 1.0),
                AgentProfile::new("beta", "Beta").with_keyword("alpha", 1.0),
            ],
            "zeta",
        )
        .unwrap();
        let decision = Router::default().route("alpha", &registry);
        assert_eq!(ids(&decision), vec!["beta", "zeta"]);
    }

    #[test]
    fn test_max_secondaries() {
        let router = Router::new(RouterConfig::default().with_max_secondaries(1)).unwrap();
        let decision = router.route("tuition for calculus and my career", &registry());
        assert_eq!(ids(&decision), vec!["financial_aid", "course_difficulty"]);

        let router = Router::new(RouterConfig::default().with_max_secondaries(0)).unwrap();
        let decision = router.route("tuition for calculus and my career", &registry());
        assert_eq!(ids(&decision), vec!["financial_aid"]);
    }

    #[test]
    fn test_no_match_routes_to_general_agent() {
        let decision = Router::default().route("hello there", &registry());
        assert_eq!(ids(&decision), vec!["coordinator"]);
        assert!(decision.confidence().abs() < f64::EPSILON);
        assert!(!decision.is_multi_agent());
    }

    #[test]
    fn test_zero_weight_keywords_do_not_select() {
        let registry = ProfileRegistry::new(
            vec![
                AgentProfile::new("financial_aid", "Financial Aid").with_keywords(["cost"], 5.0),
                AgentProfile::new("career", "Career").with_keywords(["cost", "career"], 0.0),
                AgentProfile::new("coordinator", "Coordinator"),
            ],
            "coordinator",
        )
        .unwrap();
        let decision = Router::default().route("How much does UC Berkeley cost?", &registry);
        assert_eq!(ids(&decision), vec!["financial_aid"]);
        assert!(decision.confidence() > 0.0);
    }

    #[test]
    fn test_routing_is_deterministic() {
        let router = Router::default();
        let registry = registry();
        let query = "Is calculus hard and what does tuition cost for a computer science major?";
        let first = router.route(query, &registry);
        for _ in 0..20 {
            assert_eq!(router.route(query, &registry), first);
        }
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        let decision = Router::default().route("cost cost cost career", &registry());
        assert_eq!(ids(&decision), vec!["financial_aid", "career_counselor"]);
    }

    #[test]
    fn test_invalid_epsilon_rejected() {
        assert!(Router::new(RouterConfig::default().with_epsilon(-0.1)).is_err());
        assert!(Router::new(RouterConfig::default().with_epsilon(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_explain_lists_every_agent() {
        let explanation = Router::default().explain("What's the cost of a CS major?", &registry());
        assert_eq!(explanation.agents.len(), 4);
        assert_eq!(explanation.tokens[0], "what");
        let fa = explanation
            .agents
            .iter()
            .find(|a| a.agent_id.as_str() == "financial_aid")
            .unwrap();
        assert_eq!(fa.matched_keywords, vec!["cost"]);
        assert_eq!(explanation.selected().as_str(), "financial_aid");
    }
}
