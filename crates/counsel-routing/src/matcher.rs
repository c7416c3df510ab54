//! Token and phrase matching.
//!
//! Text is lowercased and split on every non-alphanumeric character, so
//! `what's` becomes `what` and `s`. A keyword matches a query token that is
//! equal to it or equal to it plus `s` or `es`. Multi-word keywords must
//! appear as a contiguous run of tokens; only the last token of the run may
//! carry the plural suffix.

/// Split text into lowercase alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn token_matches(query_token: &str, keyword_token: &str, allow_plural: bool) -> bool {
    if query_token == keyword_token {
        return true;
    }
    if !allow_plural {
        return false;
    }
    query_token
        .strip_prefix(keyword_token)
        .is_some_and(|suffix| suffix == "s" || suffix == "es")
}

/// A query prepared for repeated keyword lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTokens {
    tokens: Vec<String>,
}

impl QueryTokens {
    /// Tokenize a query
    pub fn new(query: &str) -> Self {
        Self {
            tokens: tokenize(query),
        }
    }

    /// The query tokens in order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether the query has no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether a keyword or phrase occurs in the query
    pub fn contains(&self, keyword: &str) -> bool {
        let phrase = tokenize(keyword);
        let Some((last, head)) = phrase.split_last() else {
            return false;
        };
        if phrase.len() > self.tokens.len() {
            return false;
        }

        self.tokens.windows(phrase.len()).any(|window| {
            let (window_last, window_head) = match window.split_last() {
                Some(parts) => parts,
                None => return false,
            };
            window_head
                .iter()
                .zip(head)
                .all(|(q, k)| token_matches(q, k, false))
                && token_matches(window_last, last, true)
        })
    }

    /// Whether any of the keywords occurs in the query
    pub fn contains_any<I, S>(&self, keywords: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keywords.into_iter().any(|k| self.contains(k.as_ref()))
    }
}
