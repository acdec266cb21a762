//! Immutable broker registry snapshots.
//!
//! A [`BrokerRegistry`] is built once from a list of records and never
//! mutated afterwards, so it can be shared across concurrent assessments
//! behind an `Arc` without locking.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One registered broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrokerRecord {
    /// Registered broker name. Not unique across records.
    pub name: String,
    /// Registration number (e.g. `INZ000123456`). Unique.
    #[serde(alias = "registration_no")]
    pub registration_number: String,
}

impl BrokerRecord {
    /// Create a record.
    pub fn new(name: impl Into<String>, registration_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration_number: registration_number.into(),
        }
    }
}

/// String matching policy for registry lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Exact, case-sensitive equality. No whitespace normalization.
    #[default]
    Exact,
    /// Unicode-lowercased equality on both name and registration number.
    CaseInsensitive,
}

/// Read-only lookup capability over a set of brokers.
pub trait BrokerLookup: Send + Sync {
    /// True if a record with exactly this `(name, registration_number)` pair exists.
    fn contains_pair(&self, name: &str, registration_number: &str) -> bool;

    /// True if any record carries this name.
    fn contains_name(&self, name: &str) -> bool;
}

/// Immutable snapshot of the broker registry.
#[derive(Debug, Clone, Default)]
pub struct BrokerRegistry {
    /// Records in ingestion order, first occurrence of each registration number.
    records: Vec<BrokerRecord>,
    /// Registration number → name.
    by_registration: HashMap<String, String>,
    /// All names.
    names: HashSet<String>,
    /// Lowercased registration number → lowercased name.
    folded_by_registration: HashMap<String, String>,
    /// Lowercased names.
    folded_names: HashSet<String>,
    /// Lookup policy.
    policy: MatchPolicy,
}

impl BrokerRegistry {
    /// Build a snapshot from records with exact matching.
    ///
    /// Registration numbers are unique: when a number repeats, the first
    /// record wins and later ones are ignored.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = BrokerRecord>,
    {
        Self::with_policy(records, MatchPolicy::Exact)
    }

    /// Build a snapshot from records with the given lookup policy.
    pub fn with_policy<I>(records: I, policy: MatchPolicy) -> Self
    where
        I: IntoIterator<Item = BrokerRecord>,
    {
        let mut registry = Self {
            policy,
            ..Self::default()
        };
        let mut ignored = 0usize;

        for record in records {
            if registry
                .by_registration
                .contains_key(&record.registration_number)
            {
                ignored += 1;
                continue;
            }
            registry.by_registration.insert(
                record.registration_number.clone(),
                record.name.clone(),
            );
            registry.names.insert(record.name.clone());
            registry.folded_by_registration.insert(
                record.registration_number.to_lowercase(),
                record.name.to_lowercase(),
            );
            registry.folded_names.insert(record.name.to_lowercase());
            registry.records.push(record);
        }

        if ignored > 0 {
            warn!(
                ignored,
                kept = registry.records.len(),
                "Duplicate registration numbers ignored while building registry"
            );
        }
        debug!(brokers = registry.records.len(), policy = ?policy, "Registry snapshot built");

        registry
    }

    /// Return a copy of this snapshot using a different lookup policy.
    #[must_use]
    pub fn into_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lookup policy in effect.
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Number of brokers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the snapshot holds no brokers.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ingestion order.
    pub fn records(&self) -> &[BrokerRecord] {
        &self.records
    }

    /// Number of distinct broker names.
    pub fn distinct_names(&self) -> usize {
        self.names.len()
    }
}

impl BrokerLookup for BrokerRegistry {
    fn contains_pair(&self, name: &str, registration_number: &str) -> bool {
        match self.policy {
            MatchPolicy::Exact => self
                .by_registration
                .get(registration_number)
                .is_some_and(|n| n == name),
            MatchPolicy::CaseInsensitive => self
                .folded_by_registration
                .get(&registration_number.to_lowercase())
                .is_some_and(|n| *n == name.to_lowercase()),
        }
    }

    fn contains_name(&self, name: &str) -> bool {
        match self.policy {
            MatchPolicy::Exact => self.names.contains(name),
            MatchPolicy::CaseInsensitive => self.folded_names.contains(&name.to_lowercase()),
        }
    }
}
