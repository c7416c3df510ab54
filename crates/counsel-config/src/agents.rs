//! Agent roster configuration.

use counsel_core::{AgentId, AgentProfile, ConfigError, ProfileRegistry};
use serde::{Deserialize, Serialize};

/// Agent roster: the profiles plus the general agent used when nothing matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Agent that answers when no keyword matches
    pub general: AgentId,
    /// Agent profiles
    pub profiles: Vec<AgentProfile>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            general: AgentId::new("coordinator"),
            profiles: default_profiles(),
        }
    }
}

impl AgentSettings {
    /// Build the validated profile registry
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the roster is inconsistent
    pub fn build_registry(&self) -> Result<ProfileRegistry, ConfigError> {
        ProfileRegistry::new(self.profiles.clone(), self.general.clone())
    }
}

const FINANCIAL_AID_KEYWORDS: &[&str] = &[
    "cost", "money", "fafsa", "financial", "scholarship", "afford", "tuition", "grant",
    "expensive", "budget", "payment", "aid", "funding", "cal grant", "pell grant",
];

const COURSE_KEYWORDS: &[&str] = &[
    "difficult", "study", "academic", "course", "struggling", "calculus", "chemistry",
    "physics", "roadmap", "transfer", "plan", "schedule", "semester", "prerequisites",
    "sequence", "math", "science", "english", "requirements", "units", "classes",
    "curriculum", "igetc", "breadth", "ge", "general education", "lower division",
    "upper division", "planning", "pathway", "preparation", "recommend", "suggestion",
];

const CAREER_KEYWORDS: &[&str] = &[
    "major", "career", "job", "business", "psychology", "engineering", "computer science",
    "prospects", "employment", "profession", "occupation", "work", "salary", "internship",
    "networking",
];

/// The shipped roster: three specialists and the transfer coordinator
#[must_use]
pub fn default_profiles() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("financial_aid", "Financial Aid Specialist")
            .with_priority(1)
            .with_keywords(FINANCIAL_AID_KEYWORDS.iter().copied(), 1.0)
            .with_instructions(
                "You are a Financial Aid Specialist for UC/CSU transfer students. \
                 Help with FAFSA and Dream Act applications, scholarships, Cal Grant and \
                 Pell Grant eligibility, cost of attendance, loans, and work-study. \
                 Give concrete steps and deadlines, and point to official resources.",
            ),
        AgentProfile::new("course_difficulty", "Academic Advisor")
            .with_priority(2)
            .with_keywords(COURSE_KEYWORDS.iter().copied(), 1.0)
            .with_instructions(
                "You are an Academic Advisor for community college students transferring \
                 to UC/CSU. Help with course sequencing, IGETC and CSU GE breadth, major \
                 preparation, workload balance, and study strategies. Recommend checking \
                 ASSIST.org for articulation.",
            ),
        AgentProfile::new("career_counselor", "Career Counselor")
            .with_priority(3)
            .with_keywords(CAREER_KEYWORDS.iter().copied(), 1.0)
            .with_instructions(
                "You are a Career Counselor for UC/CSU transfer students. Help with major \
                 selection, career outlook, salary expectations, internships, networking, \
                 and how transfer pathways connect to career goals.",
            ),
        AgentProfile::new("coordinator", "Transfer Coordinator")
            .with_priority(4)
            .with_instructions(
                "You are the Transfer Coordinator for UC/CSU transfer students. Answer \
                 general transfer questions, keep the conversation within transfer and \
                 career planning, and suggest which specialist topics to explore next.",
            ),
    ]
}
