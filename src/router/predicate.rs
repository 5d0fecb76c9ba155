//! Predicates over module identifiers

use std::fmt;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a predicate compares its pattern against a module identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Plain substring containment
    #[default]
    Contains,
    /// Contiguous run of whole `/`-separated path segments
    Segment,
    /// Glob matched against the whole identifier
    Glob,
    /// Regular expression searched anywhere in the identifier
    Regex,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Contains => "contains",
            MatchStrategy::Segment => "segment",
            MatchStrategy::Glob => "glob",
            MatchStrategy::Regex => "regex",
        }
    }
}

/// A compiled predicate
///
/// Predicates are immutable once built and are shared across threads by
/// reference.
#[derive(Debug, Clone)]
pub enum Predicate {
    Contains(String),
    Segment {
        pattern: String,
        segments: Vec<String>,
    },
    Glob {
        pattern: String,
        matcher: GlobMatcher,
    },
    Regex(Regex),
}

impl Predicate {
    /// Compile a pattern with the given strategy
    pub fn new(strategy: MatchStrategy, pattern: &str) -> Result<Self, ConfigError> {
        if pattern.is_empty() {
            return Err(ConfigError::EmptyPattern {
                strategy: strategy.as_str(),
            });
        }

        match strategy {
            MatchStrategy::Contains => Ok(Predicate::Contains(pattern.to_string())),
            MatchStrategy::Segment => {
                let segments: Vec<String> = split_segments(pattern)
                    .map(str::to_string)
                    .collect();
                if segments.is_empty() {
                    return Err(ConfigError::EmptyPattern {
                        strategy: strategy.as_str(),
                    });
                }
                Ok(Predicate::Segment {
                    pattern: pattern.to_string(),
                    segments,
                })
            }
            MatchStrategy::Glob => {
                let matcher = Glob::new(pattern)
                    .map_err(|source| ConfigError::InvalidGlob {
                        pattern: pattern.to_string(),
                        source,
                    })?
                    .compile_matcher();
                Ok(Predicate::Glob {
                    pattern: pattern.to_string(),
                    matcher,
                })
            }
            MatchStrategy::Regex => {
                let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(Predicate::Regex(regex))
            }
        }
    }

    pub(crate) fn contains(pattern: &str) -> Self {
        Predicate::Contains(pattern.to_string())
    }

    /// Test a module identifier
    pub fn matches(&self, id: &str) -> bool {
        match self {
            Predicate::Contains(needle) => id.contains(needle.as_str()),
            Predicate::Segment { segments, .. } => {
                let haystack: Vec<&str> = split_segments(id).collect();
                haystack
                    .windows(segments.len())
                    .any(|window| window.iter().zip(segments).all(|(a, b)| *a == b.as_str()))
            }
            Predicate::Glob { matcher, .. } => matcher.is_match(id),
            Predicate::Regex(regex) => regex.is_match(id),
        }
    }

    pub fn strategy(&self) -> MatchStrategy {
        match self {
            Predicate::Contains(_) => MatchStrategy::Contains,
            Predicate::Segment { .. } => MatchStrategy::Segment,
            Predicate::Glob { .. } => MatchStrategy::Glob,
            Predicate::Regex(_) => MatchStrategy::Regex,
        }
    }

    /// The pattern as written in the configuration
    pub fn pattern(&self) -> &str {
        match self {
            Predicate::Contains(pattern) => pattern,
            Predicate::Segment { pattern, .. } => pattern,
            Predicate::Glob { pattern, .. } => pattern,
            Predicate::Regex(regex) => regex.as_str(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.strategy().as_str(), self.pattern())
    }
}

/// Split on `/` and `\`, dropping empty segments
fn split_segments(s: &str) -> impl Iterator<Item = &str> {
    s.split(['/', '\\']).filter(|seg| !seg.is_empty())
}
