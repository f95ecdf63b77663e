//! Ignore rules for infrastructure tasks
//!
//! A rule decides, from the body of a stack record alone, whether the task
//! belongs to the runtime or test harness rather than to user code. Rules
//! are checked in order and the first match wins.
//!
//! Supports:
//! - Substrings: `IgnoreRule::substring("name: ctrl-c")`
//! - Regular expressions: `IgnoreRule::pattern(r"name: tokio-runtime-w")`
//! - Arbitrary predicates: `IgnoreRule::predicate(|body| body.len() > 4096)`

use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Record bodies of infrastructure threads that are never leaks
const DEFAULT_SUBSTRINGS: &[&str] = &[
    // Threads on their way out
    "state: Z (zombie)",
    "state: X (dead)",
    // Signal delivery
    "name: ctrl-c",
    "name: signal-hook",
    // tracing-appender's background writer
    "name: tracing-append",
    // HTTP keep-alive loops of the blocking client
    "name: reqwest-intern",
    // Our own threads
    "name: leakcheck",
];

/// A single matcher over a record body
#[derive(Clone)]
pub enum IgnoreRule {
    Substring(Cow<'static, str>),
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl IgnoreRule {
    pub fn substring(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Substring(text.into())
    }

    /// Compile a regex rule
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, body: &str) -> bool {
        match self {
            Self::Substring(text) => body.contains(text.as_ref()),
            Self::Pattern(re) => re.is_match(body),
            Self::Predicate(f) => f(body),
        }
    }
}

impl fmt::Debug for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(text) => f.debug_tuple("Substring").field(text).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Ordered list of ignore rules
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    /// A list with no rules at all
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Copy of this list with `rule` appended; `self` is left untouched
    pub fn with(&self, rule: IgnoreRule) -> Self {
        let mut rules = self.rules.clone();
        rules.push(rule);
        Self { rules }
    }

    pub fn push(&mut self, rule: IgnoreRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IgnoreRule> {
        self.rules.iter()
    }

    /// True if any rule matches `body`
    pub fn matches(&self, body: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(body))
    }
}

impl Default for IgnoreRules {
    /// The infrastructure threads every check ignores
    fn default() -> Self {
        Self {
            rules: DEFAULT_SUBSTRINGS
                .iter()
                .map(|s| IgnoreRule::substring(*s))
                .collect(),
        }
    }
}

impl FromIterator<IgnoreRule> for IgnoreRules {
    fn from_iter<I: IntoIterator<Item = IgnoreRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl Extend<IgnoreRule> for IgnoreRules {
    fn extend<I: IntoIterator<Item = IgnoreRule>>(&mut self, iter: I) {
        self.rules.extend(iter);
    }
}
