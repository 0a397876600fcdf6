//! Extraction rules applied to raw profile markup.
//!
//! The page embeds its hydration state as JSON, and the platform reshuffles
//! that format often. Rather than parsing the document, we run an ordered
//! list of independent rules over the raw body and take the first hit —
//! adding, removing, or reordering rules never touches the control flow.
//! Brittle by construction; when the page changes, a new rule goes at the
//! front of [`ExtractorChain::standard`].
use regex::Regex;

/// A single attempt at pulling a follower count out of raw markup.
pub trait Extract: Send + Sync {
    fn name(&self) -> &str;
    fn attempt(&self, body: &str) -> Option<u64>;
}

/// Rule backed by a regex whose first capture group is the count.
pub struct RegexRule {
    name: &'static str,
    pattern: Regex,
}

impl RegexRule {
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Extract for RegexRule {
    fn name(&self) -> &str {
        self.name
    }

    fn attempt(&self, body: &str) -> Option<u64> {
        self.pattern
            .captures(body)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Ordered rule list; first successful rule wins.
pub struct ExtractorChain {
    rules: Vec<Box<dyn Extract>>,
}

impl ExtractorChain {
    pub fn new(rules: Vec<Box<dyn Extract>>) -> Self {
        Self { rules }
    }

    /// The rules observed to work against the current page format, most
    /// specific first.
    pub fn standard() -> Self {
        let rules: Vec<Box<dyn Extract>> = vec![
            Box::new(
                RegexRule::new("follower-count", r#""followerCount":\s*(\d+)"#)
                    .expect("static pattern"),
            ),
            Box::new(
                RegexRule::new("follower-count-quoted", r#""followerCount":\s*"(\d+)""#)
                    .expect("static pattern"),
            ),
            Box::new(RegexRule::new("fans", r#""fans":\s*(\d+)"#).expect("static pattern")),
        ];
        Self::new(rules)
    }

    /// Run the chain over `body`; stops at the first rule that matches.
    pub fn attempt(&self, body: &str) -> Option<u64> {
        for rule in &self.rules {
            if let Some(count) = rule.attempt(body) {
                tracing::debug!(rule = rule.name(), count, "extraction rule matched");
                return Some(count);
            }
        }
        None
    }
}
