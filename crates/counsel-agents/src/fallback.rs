//! Canned responses used when the provider cannot answer.
//!
//! Lookup is total: every agent id, known or not, gets a response, and no
//! external service is involved.

use counsel_core::AgentId;
use counsel_routing::QueryTokens;
use std::collections::HashMap;

/// One intent bucket: any keyword match selects the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackIntent {
    /// Keywords or phrases for the bucket
    pub keywords: Vec<String>,
    /// Response text
    pub response: String,
}

#[derive(Debug, Clone, Default)]
struct AgentFallbacks {
    intents: Vec<FallbackIntent>,
    default: Option<String>,
}

/// Deterministic fallback table keyed by agent id
#[derive(Debug, Clone, Default)]
pub struct FallbackResponder {
    table: HashMap<AgentId, AgentFallbacks>,
}

impl FallbackResponder {
    /// Empty table; every agent gets the generic response
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with guidance for the shipped transfer agents
    #[must_use]
    pub fn transfer_defaults() -> Self {
        Self::empty()
            .with_intent("financial_aid", &["cost", "expensive", "afford", "money", "tuition"], FA_COST)
            .with_intent("financial_aid", &["fafsa", "financial aid", "scholarship"], FA_FAFSA)
            .with_default("financial_aid", FA_DEFAULT)
            .with_intent("career_counselor", &["business"], CAREER_BUSINESS)
            .with_intent("career_counselor", &["major", "career", "job"], CAREER_MAJOR)
            .with_default("career_counselor", CAREER_DEFAULT)
            .with_intent(
                "course_difficulty",
                &["difficult", "hard", "struggling", "organic chemistry", "calculus", "physics"],
                COURSE_DIFFICULT,
            )
            .with_intent(
                "course_difficulty",
                &["roadmap", "plan", "course", "transfer", "schedule"],
                COURSE_ROADMAP,
            )
            .with_default("course_difficulty", COURSE_DEFAULT)
            .with_intent(
                "coordinator",
                &["cost", "money", "fafsa", "financial", "scholarship", "afford"],
                COORD_FINANCIAL,
            )
            .with_intent(
                "coordinator",
                &["major", "career", "job", "business", "psychology"],
                COORD_CAREER,
            )
            .with_intent(
                "coordinator",
                &["difficult", "study", "academic", "course", "struggling"],
                COORD_ACADEMIC,
            )
            .with_default("coordinator", COORD_WELCOME)
    }

    /// Add an intent bucket for an agent; buckets are tried in insertion order
    #[must_use]
    pub fn with_intent(
        mut self,
        agent: impl Into<AgentId>,
        keywords: &[&str],
        response: impl Into<String>,
    ) -> Self {
        self.table
            .entry(agent.into())
            .or_default()
            .intents
            .push(FallbackIntent {
                keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
                response: response.into(),
            });
        self
    }

    /// Set the response used when no bucket of the agent matches
    #[must_use]
    pub fn with_default(mut self, agent: impl Into<AgentId>, response: impl Into<String>) -> Self {
        self.table.entry(agent.into()).or_default().default = Some(response.into());
        self
    }

    /// Whether the table has entries for the agent
    #[must_use]
    pub fn knows(&self, agent: &AgentId) -> bool {
        self.table.contains_key(agent)
    }

    /// Canned response for the agent and query
    #[must_use]
    pub fn respond(&self, agent: &AgentId, query: &str) -> String {
        let Some(entry) = self.table.get(agent) else {
            return Self::generic(agent);
        };

        let tokens = QueryTokens::new(query);
        entry
            .intents
            .iter()
            .find(|intent| tokens.contains_any(&intent.keywords))
            .map(|intent| intent.response.clone())
            .or_else(|| entry.default.clone())
            .unwrap_or_else(|| Self::generic(agent))
    }

    /// On-topic redirection for agents without canned guidance
    #[must_use]
    pub fn generic(agent: &AgentId) -> String {
        format!(
            "I'm here to help with your UC/CSU transfer questions. As your {}, I can assist \
             with topics in my area of expertise. Could you please provide more details about \
             what you'd like to know?",
            agent.title_case()
        )
    }
}

const FA_COST: &str = "\
UC and CSU costs at a glance:

**UC (California residents):** about $14,000-15,000 per year in tuition and fees, \
roughly $35,000-40,000 with housing and food.

**CSU (California residents):** about $6,000-7,000 per year in tuition and fees, \
roughly $25,000-30,000 with housing and food.

**Next steps:**
1. File the FAFSA (or CA Dream Act) by the March 2 priority deadline
2. Cal Grant eligibility is checked automatically from the FAFSA
3. Look for campus scholarships and grants for transfer students
4. Ask about work-study

Your campus financial aid office can review your situation in detail.";

const FA_FAFSA: &str = "\
Financial aid for transfer students:

**FAFSA:** the March 2 priority deadline applies every year. It unlocks federal grants, \
loans, and work-study, and uses the prior year's tax information.

**Programs to know:**
- Pell Grant: need-based federal grant, no repayment
- Cal Grant A: covers tuition at UC and CSU
- Cal Grant B: adds a living allowance
- Federal Direct Loans: borrow only what you need

Apply early, answer verification requests quickly, and check each campus scholarship \
portal. studentaid.gov has the official forms.";

const FA_DEFAULT: &str = "I can help with financial aid questions including FAFSA, \
scholarships, grants, and cost planning for UC/CSU transfer students.";

const CAREER_BUSINESS: &str = "\
Business at UC vs CSU:

**UC:** research-oriented and theoretical, strong preparation for graduate school, \
competitive admission and higher cost.

**CSU:** practical and career-focused, strong industry ties and internships, \
more accessible admission and lower cost.

Both lead to good careers. Pick the system that fits how you learn, what you want to do \
after graduation, and what you can afford.";

const CAREER_MAJOR: &str = "\
Choosing a transfer major:

**Transfer-friendly majors** include business administration, psychology, computer \
science, engineering (varies by campus), biology, and communications.

**Questions to ask yourself:**
1. Which subjects keep your interest?
2. Where are your strengths?
3. What salary and work-life balance do you want?
4. Would you consider graduate school?

O*NET and the Bureau of Labor Statistics publish career outlooks. Your campus career \
center can help with an assessment.";

const CAREER_DEFAULT: &str = "I can help with career guidance including major selection, \
career paths, job market analysis, and UC vs CSU program comparisons.";

const COURSE_DIFFICULT: &str = "\
Handling a difficult course:

**Study strategies:** explain concepts to someone else, review on a spaced schedule, \
work practice problems instead of rereading, and join a serious study group.

**For STEM classes:** start homework early, understand the concept before the formula, \
and work old exams when they are available.

**Campus help:** tutoring centers, supplemental instruction, office hours, and academic \
counseling are there for exactly this. Ask early, before you fall behind.";

const COURSE_ROADMAP: &str = "\
Building a transfer course roadmap:

1. **Requirements:** check ASSIST.org for your target campuses, follow IGETC or CSU GE \
Breadth, and list the major preparation courses.
2. **Sequence:** take English, math, and core prerequisites first, then finish general \
education and the remaining major courses. Mix hard and light courses each term.
3. **GPA:** aim for 3.0+ for CSU and 3.2+ for UC; competitive majors need more.

A transfer counselor can turn this into a term-by-term plan.";

const COURSE_DEFAULT: &str = "I can help with academic planning including course \
roadmaps, study strategies, time management, and transfer preparation.";

const COORD_FINANCIAL: &str = "\
That sounds like a financial aid question. File the FAFSA by the March 2 priority \
deadline; total cost is roughly $35-40k per year at UC and $25-30k at CSU, and many grants \
and scholarships are open to transfer students. Ask about cost, FAFSA, or scholarships \
and the Financial Aid Specialist will go into detail.";

const COORD_CAREER: &str = "\
That sounds like a career or major question. Think about your interests, strengths, \
and goals, and look at job market data. UC programs lean toward research, CSU programs \
toward practice. Ask about a specific major or career and the Career Counselor will \
go into detail.";

const COORD_ACADEMIC: &str = "\
That sounds like an academic planning question. Start studying early, use active \
learning, and take advantage of tutoring and office hours. Ask about a specific course \
or your transfer plan and the Academic Advisor will go into detail.";

const COORD_WELCOME: &str = "\
Welcome to UC/CSU transfer counseling. I can help with:

- **Financial aid:** FAFSA, scholarships, grants, cost planning
- **Careers:** choosing a major, career paths, job outlook
- **Academics:** course planning, study strategies, transfer requirements

For example: \"How much does it cost to transfer to UC Berkeley?\" or \"I'm struggling \
with calculus, what should I do?\"";
