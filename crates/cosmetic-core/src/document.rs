//! Rule database model and rule engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::rule::{timestamp_now, Rule, RuleCandidate};
use crate::{CoreError, Result};

/// Schema version written to disk
pub const CONFIG_VERSION: u32 = 1;

/// The whole cosmetic filter database.
///
/// Hosts are kept in a `BTreeMap` so iteration and serialization are always
/// in lexicographic host order. A host key only exists while it has rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub filters: BTreeMap<String, Vec<Rule>>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            version: CONFIG_VERSION,
        }
    }
}

/// Result of trying to append a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored at this 1-based position
    Appended(usize),
    /// An identical (selector, hasText) pair already exists
    Duplicate,
    /// Selector was empty after trimming
    EmptySelector,
    /// Host was empty after trimming
    EmptyHost,
}

impl AppendOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, AppendOutcome::Appended(_))
    }
}

/// A rule taken out of the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub rule: Rule,
    /// The host had no rules left and its key was deleted
    pub host_emptied: bool,
}

impl ConfigDocument {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Rules stored for `host`, in application order
    pub fn rules_for(&self, host: &str) -> Option<&[Rule]> {
        self.filters.get(host).map(Vec::as_slice)
    }

    /// Append a rule stamped with the current time.
    pub fn append_rule(&mut self, host: &str, candidate: &RuleCandidate) -> AppendOutcome {
        self.append_rule_at(host, candidate, timestamp_now())
    }

    /// Append a rule with an explicit `created_at` value.
    ///
    /// Nothing is mutated unless the outcome is `Appended`.
    pub fn append_rule_at(
        &mut self,
        host: &str,
        candidate: &RuleCandidate,
        created_at: String,
    ) -> AppendOutcome {
        let host = host.trim();
        if host.is_empty() {
            return AppendOutcome::EmptyHost;
        }

        let (selector, has_text) = candidate.normalized();
        if selector.is_empty() {
            return AppendOutcome::EmptySelector;
        }

        if let Some(rules) = self.filters.get(host)
            && rules
                .iter()
                .any(|r| r.same_target(&selector, has_text.as_deref()))
        {
            debug!("Existing rule matches selector/text for {}", host);
            return AppendOutcome::Duplicate;
        }

        let rules = self.filters.entry(host.to_string()).or_default();
        rules.push(Rule::new(selector, has_text, created_at));
        debug!("Appended rule #{} for {}", rules.len(), host);
        AppendOutcome::Appended(rules.len())
    }

    /// Remove the rule at 1-based `index` for `host`.
    ///
    /// Deletes the host key when its last rule goes away.
    pub fn remove_rule(&mut self, host: &str, index: i64) -> Result<Removal> {
        let host = host.trim();
        let len = self.filters.get(host).map_or(0, Vec::len);
        if index < 1 || index as u64 > len as u64 {
            return Err(CoreError::IndexOutOfRange {
                host: host.to_string(),
                index,
                len,
            });
        }

        let rules = self
            .filters
            .get_mut(host)
            .ok_or_else(|| CoreError::IndexOutOfRange {
                host: host.to_string(),
                index,
                len,
            })?;
        let rule = rules.remove((index - 1) as usize);
        let host_emptied = rules.is_empty();
        if host_emptied {
            self.filters.remove(host);
        }

        Ok(Removal { rule, host_emptied })
    }

    /// All hosts in lexicographic order, each with its rules in storage order
    pub fn list_filters(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.filters
            .iter()
            .map(|(host, rules)| (host.as_str(), rules.as_slice()))
    }

    /// Drop host keys that carry no rules. Returns how many were dropped.
    pub fn prune_empty_hosts(&mut self) -> usize {
        let before = self.filters.len();
        self.filters.retain(|_, rules| !rules.is_empty());
        before - self.filters.len()
    }
}
