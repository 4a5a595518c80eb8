use regex::RegexSet;
use crate::error::{Result, WatchError};

/// Any path containing this substring is out of scope, whatever the patterns say.
///
/// This is a plain substring test, so `digitalocean.conf` is excluded along
/// with `.git/` metadata.
pub const EXCLUDED_SUBSTRING: &str = "git";

/// Decides whether a path is in scope for tracking.
///
/// Patterns are regular expressions searched anywhere in the path string, not
/// anchored to the whole path: `\.tmp` matches `notes.tmp.bak`.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<String>,
    set: RegexSet,
}

impl PatternMatcher {
    /// Compile `patterns` once. An empty list matches every path.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();

        // Compile one by one first so the error names the offending pattern.
        for pattern in &patterns {
            regex::Regex::new(pattern).map_err(|source| WatchError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let set = RegexSet::new(&patterns).map_err(|source| WatchError::InvalidPattern {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self { patterns, set })
    }

    /// Matcher with no patterns; only the substring exclusion applies.
    pub fn match_all() -> Self {
        Self {
            patterns: Vec::new(),
            set: RegexSet::empty(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        if path.contains(EXCLUDED_SUBSTRING) {
            return false;
        }

        self.patterns.is_empty() || self.set.is_match(path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::match_all()
    }
}
