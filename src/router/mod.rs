//! Chunk routing
//!
//! Decides which output partition a module lands in. The decision is a pure
//! function of the module identifier and an immutable [`RuleTable`]:
//!
//! 1. Modules that do not match the third-party predicate stay with the
//!    application code (`None`).
//! 2. Third-party modules are checked against the named library rules in
//!    declared order; the first match wins.
//! 3. Any other third-party module goes to the fallback partition.
//!
//! A rule that is missing or too narrow degrades to the fallback partition.
//! Routing never fails.

mod predicate;

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

pub use predicate::{MatchStrategy, Predicate};

/// Name of an output partition
///
/// Partition names end up in file names, so they are restricted to ASCII
/// alphanumerics, `-`, `_` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PartitionName(String);

impl PartitionName {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if is_valid_chunk_name(&name) {
            Ok(Self(name))
        } else {
            Err(ConfigError::InvalidPartitionName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether `name` is safe to use as an output file stem
pub(crate) fn is_valid_chunk_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A predicate paired with the partition it routes to
#[derive(Debug, Clone)]
pub struct PartitionRule {
    pub predicate: Predicate,
    pub partition: PartitionName,
}

impl PartitionRule {
    pub fn new(predicate: Predicate, partition: PartitionName) -> Self {
        Self {
            predicate,
            partition,
        }
    }
}

/// Outcome of routing one module identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision<'t> {
    /// Not third-party: co-bundled with the entry that reaches it
    Application,

    /// Matched the named library rule at `rule` (declaration order)
    Library {
        rule: usize,
        partition: &'t PartitionName,
    },

    /// Third-party code no library rule claimed
    Vendor { partition: &'t PartitionName },
}

impl<'t> RoutingDecision<'t> {
    pub fn partition(&self) -> Option<&'t PartitionName> {
        match *self {
            RoutingDecision::Application => None,
            RoutingDecision::Library { partition, .. } => Some(partition),
            RoutingDecision::Vendor { partition } => Some(partition),
        }
    }
}

/// Ordered, immutable routing rules for one build
#[derive(Debug, Clone)]
pub struct RuleTable {
    third_party: Predicate,
    rules: Vec<PartitionRule>,
    fallback: PartitionName,
}

impl RuleTable {
    /// Build a table, rejecting duplicate partition names
    pub fn new(
        third_party: Predicate,
        rules: Vec<PartitionRule>,
        fallback: PartitionName,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for name in rules.iter().map(|r| &r.partition).chain([&fallback]) {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicatePartition(name.to_string()));
            }
        }

        Ok(Self {
            third_party,
            rules,
            fallback,
        })
    }

    /// Route a module identifier, reporting which rule decided
    pub fn decide(&self, id: &str) -> RoutingDecision<'_> {
        if !self.third_party.matches(id) {
            return RoutingDecision::Application;
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.predicate.matches(id) {
                return RoutingDecision::Library {
                    rule: index,
                    partition: &rule.partition,
                };
            }
        }

        RoutingDecision::Vendor {
            partition: &self.fallback,
        }
    }

    /// Route a module identifier to its partition, or `None` for application code
    pub fn route(&self, id: &str) -> Option<&PartitionName> {
        self.decide(id).partition()
    }

    /// All partition names in emission order: library rules, then the fallback
    pub fn partitions(&self) -> impl Iterator<Item = &PartitionName> {
        self.rules
            .iter()
            .map(|r| &r.partition)
            .chain(std::iter::once(&self.fallback))
    }

    pub fn third_party(&self) -> &Predicate {
        &self.third_party
    }

    pub fn rules(&self) -> &[PartitionRule] {
        &self.rules
    }
}

impl Default for RuleTable {
    /// `node_modules` is third-party, `mdui` gets its own chunk, the rest is `vendor`
    fn default() -> Self {
        Self {
            third_party: Predicate::contains("node_modules"),
            rules: vec![PartitionRule::new(
                Predicate::contains("mdui"),
                PartitionName("mdui".to_string()),
            )],
            fallback: PartitionName("vendor".to_string()),
        }
    }
}

/// Route `id` through `table`
pub fn route<'t>(table: &'t RuleTable, id: &str) -> Option<&'t PartitionName> {
    table.route(id)
}
