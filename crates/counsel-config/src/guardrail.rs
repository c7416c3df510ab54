//! Topic guardrail settings.

use counsel_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Allowed-topic category with its keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCategory {
    /// Category name reported when a keyword matches
    pub name: String,
    /// Words or phrases that mark a query as on topic
    pub keywords: Vec<String>,
}

impl TopicCategory {
    /// Create a category
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }
}

/// Lists and redirect messages for the topic guardrail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailSettings {
    /// Disable to allow every query
    pub enabled: bool,
    /// Phrases that always block
    pub blocked_topics: Vec<String>,
    /// Categories of on-topic keywords, checked in order
    pub allowed_topics: Vec<TopicCategory>,
    /// Words that make an otherwise unmatched query on topic
    pub contextual_indicators: Vec<String>,
    /// Reply when a blocked topic matches
    pub blocked_message: String,
    /// Reply when nothing on topic matches
    pub off_topic_message: String,
}

impl Default for GuardrailSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_topics: strings(&[
                "personal relationships", "dating", "social media", "entertainment",
                "politics", "religion", "medical advice", "legal advice",
                "financial investment", "cryptocurrency", "gambling",
            ]),
            allowed_topics: vec![
                TopicCategory::new("transfer", [
                    "uc", "csu", "university of california", "california state university",
                    "transfer requirements", "prerequisites", "igetc", "csu ge", "assist.org",
                    "transfer admission guarantee", "tag", "major preparation", "articulation",
                    "transfer application", "application deadlines", "gpa requirements",
                ]),
                TopicCategory::new("career", [
                    "career counseling", "career planning", "major selection", "career paths",
                    "job prospects", "salary expectations", "internships",
                    "professional development", "career resources", "networking", "resume",
                    "interview preparation",
                ]),
                TopicCategory::new("financial_aid", [
                    "financial aid", "scholarships", "grants", "fafsa", "cal grant", "tuition",
                    "cost of attendance", "student loans", "work study", "financial planning",
                    "college affordability",
                ]),
                TopicCategory::new("academic", [
                    "course selection", "course difficulty", "study strategies",
                    "academic planning", "grade requirements", "course sequencing",
                    "academic support", "tutoring", "study groups", "time management",
                ]),
            ],
            contextual_indicators: strings(&[
                "transfer", "college", "university", "degree", "major", "career",
            ]),
            blocked_message: "I'm designed to help with college transfer and career planning \
                questions only. Please ask about UC/CSU transfers, financial aid, career \
                counseling, or academic planning."
                .to_string(),
            off_topic_message: "I can only assist with questions related to transferring to \
                UC/CSU schools, career planning, financial aid, and academic guidance. How can \
                I help you with your transfer goals?"
                .to_string(),
        }
    }
}

impl GuardrailSettings {
    /// Settings that let every query through
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check that redirect messages are present
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for an empty message or phrase
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocked_message.trim().is_empty() {
            return Err(ConfigError::invalid("guardrail.blocked_message", "must not be empty"));
        }
        if self.off_topic_message.trim().is_empty() {
            return Err(ConfigError::invalid("guardrail.off_topic_message", "must not be empty"));
        }
        let phrases = self
            .blocked_topics
            .iter()
            .chain(self.allowed_topics.iter().flat_map(|c| c.keywords.iter()))
            .chain(self.contextual_indicators.iter());
        for phrase in phrases {
            if phrase.trim().is_empty() {
                return Err(ConfigError::invalid("guardrail", "topic phrases must not be empty"));
            }
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
