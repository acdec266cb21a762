//! Data model shared by the analyzers, the aggregator, and callers.
//!
//! Every value here is created fresh for one assessment and is not mutated
//! after the analyzer that produced it returns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Document metadata: field name → string value.
///
/// Keys are stored without the leading `/` used by PDF info dictionaries,
/// so `/Author` and `Author` address the same field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct MetadataMap(BTreeMap<String, String>);

impl MetadataMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, normalizing the key.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(normalize_key(key.as_ref()), value.into());
    }

    /// Look up a field by name (with or without a leading `/`).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(normalize_key(key).as_str()).map(String::as_str)
    }

    /// Field value if present and not blank.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no fields are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().trim_start_matches('/').to_string()
}

impl From<BTreeMap<String, String>> for MetadataMap {
    fn from(raw: BTreeMap<String, String>) -> Self {
        raw.into_iter().collect()
    }
}

impl From<MetadataMap> for BTreeMap<String, String> {
    fn from(map: MetadataMap) -> Self {
        map.0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Raw signature facts reported by the signature inspection service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEvidence {
    /// At least one signature annotation exists.
    pub present: bool,
    /// Extracted signer identity, if any.
    #[serde(default)]
    pub signer: Option<String>,
}

/// Signature facts after registry verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// At least one signature annotation exists.
    pub present: bool,
    /// Extracted signer identity, if any.
    pub signer: Option<String>,
    /// Signer found in the registry. Always false when `present` is false.
    pub trusted: bool,
}

/// Result of the metadata tamper heuristics.
///
/// `flag` is true exactly when `reasons` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperReport {
    /// At least one heuristic fired.
    pub flag: bool,
    /// One entry per fired heuristic, in rule order.
    pub reasons: Vec<String>,
}

impl TamperReport {
    /// Append a reason and raise the flag.
    pub fn push(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
        self.flag = true;
    }
}

/// Result of text-risk scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRiskReport {
    /// Integer risk in [0, 100].
    pub risk_score: u8,
    /// Explanatory signals, in order.
    pub signals: Vec<String>,
}

/// Result of signature and registry verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegitimacyAssessment {
    /// Accumulated legitimacy, rounded to two decimals.
    pub legitimacy_score: f64,
    /// `(name, registration number)` pair found in the registry.
    pub broker_verified: bool,
    /// Signature facts.
    pub signature: SignatureInfo,
    /// Broker identity extracted from the text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<BrokerIdentity>,
}

/// Broker identity fields found in document text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerIdentity {
    /// Broker name token.
    pub name: Option<String>,
    /// Registration number token.
    pub registration_number: Option<String>,
}

impl BrokerIdentity {
    /// Both tokens, if both were found.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.name, &self.registration_number) {
            (Some(n), Some(r)) => Some((n.as_str(), r.as_str())),
            _ => None,
        }
    }
}

/// Final assessment handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk in [0, 100] with two-decimal precision.
    pub risk_score: f64,
    /// Explanatory signals, in order.
    pub signals: Vec<String>,
}

/// The three score components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Metadata tamper heuristics.
    Tamper,
    /// Text phishing-language scoring.
    TextRisk,
    /// Signature and registry verification.
    Legitimacy,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tamper => f.write_str("tamper"),
            Self::TextRisk => f.write_str("text_risk"),
            Self::Legitimacy => f.write_str("legitimacy"),
        }
    }
}

/// A component that fell back to its neutral default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedComponent {
    /// Which component.
    pub component: Component,
    /// Why it degraded.
    pub reason: String,
}

impl DegradedComponent {
    /// Signal string recorded in the final assessment.
    pub fn signal(&self) -> String {
        format!("degraded: {} ({})", self.component, self.reason)
    }
}

/// Full output of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Final score and signals.
    pub assessment: RiskAssessment,
    /// SHA-256 of the document bytes (hex).
    pub document_sha256: String,
    /// Tamper heuristics output.
    pub tamper: TamperReport,
    /// Text-risk output.
    pub text: TextRiskReport,
    /// Legitimacy output.
    pub legitimacy: LegitimacyAssessment,
    /// Components that degraded.
    pub degraded: Vec<DegradedComponent>,
    /// Wall-clock time spent.
    pub elapsed_ms: u64,
}
