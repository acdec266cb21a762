//! Broker identity extraction from document text.
//!
//! Extraction is a pluggable strategy so stricter or OCR-tolerant matchers
//! can replace the default without touching the legitimacy scoring.

use regex::Regex;

use crate::error::AssessError;
use crate::types::BrokerIdentity;

/// Registration numbers: `IN` followed by nine uppercase alphanumerics.
pub const REGISTRATION_PATTERN: &str = r"IN[A-Z0-9]{9}";

/// Broker name: a `Name` label, then a run of letters, spaces, ampersands.
pub const NAME_PATTERN: &str = r"(?i)Name[:\s]*([A-Za-z &]+)";

/// Finds broker identity tokens in free text.
pub trait IdentityExtractor: Send + Sync {
    /// Extract whatever identity tokens are present. Never fails.
    fn extract(&self, text: &str) -> BrokerIdentity;
}

/// Regular-expression extractor. First match only for each token.
#[derive(Debug, Clone)]
pub struct RegexIdentityExtractor {
    registration: Regex,
    name: Regex,
}

impl RegexIdentityExtractor {
    /// Extractor with the default patterns.
    pub fn new() -> Result<Self, AssessError> {
        Self::with_patterns(REGISTRATION_PATTERN, NAME_PATTERN)
    }

    /// Extractor with custom patterns. The name pattern must have one
    /// capture group holding the name.
    pub fn with_patterns(registration: &str, name: &str) -> Result<Self, AssessError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AssessError::Config {
                message: format!("invalid identity pattern {:?}: {}", pattern, e),
            })
        };
        let name = compile(name)?;
        if name.captures_len() < 2 {
            return Err(AssessError::Config {
                message: "name pattern needs a capture group".into(),
            });
        }
        Ok(Self {
            registration: compile(registration)?,
            name,
        })
    }
}

impl IdentityExtractor for RegexIdentityExtractor {
    fn extract(&self, text: &str) -> BrokerIdentity {
        let registration_number = self
            .registration
            .find(text)
            .map(|m| m.as_str().to_string());

        let name = self
            .name
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|n| !n.is_empty());

        BrokerIdentity {
            name,
            registration_number,
        }
    }
}
