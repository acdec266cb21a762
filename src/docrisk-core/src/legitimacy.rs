//! Signature and broker-registry verification.
//!
//! Legitimacy accumulates additively from a neutral base. Every applicable
//! step fires; none short-circuits the others:
//!
//! 1. start at `base`
//! 2. signature present: `+signature_present`, then the signer is looked up
//!    by name; found → `+trusted_signer`, otherwise `-untrusted_signer`
//! 3. broker `(name, registration number)` pair found in text: exact pair
//!    in the registry → `+broker_verified`, otherwise `-broker_mismatch`
//! 4. round to two decimals, then clamp into [0, 1] if configured

use std::sync::Arc;

use docrisk_registry::BrokerLookup;
use tracing::debug;

use crate::aggregator::round2;
use crate::config::LegitimacyConfig;
use crate::identity::IdentityExtractor;
use crate::types::{LegitimacyAssessment, SignatureEvidence, SignatureInfo};

/// Signal emitted when the legitimacy component degraded.
pub const VERIFICATION_UNAVAILABLE_SIGNAL: &str = "verification_unavailable";

/// Scores signer and broker identity against the registry.
pub struct SignatureRegistryAnalyzer {
    config: LegitimacyConfig,
    identity: Arc<dyn IdentityExtractor>,
}

impl SignatureRegistryAnalyzer {
    /// Create an analyzer with the given identity extraction strategy.
    pub fn new(config: LegitimacyConfig, identity: Arc<dyn IdentityExtractor>) -> Self {
        Self { config, identity }
    }

    /// Score a document's signature evidence and text.
    pub fn analyze(
        &self,
        evidence: &SignatureEvidence,
        text: &str,
        registry: &dyn BrokerLookup,
    ) -> LegitimacyAssessment {
        let cfg = &self.config;
        let mut score = cfg.base;

        let mut signature = SignatureInfo {
            present: evidence.present,
            signer: evidence.signer.clone(),
            trusted: false,
        };

        if signature.present {
            score += cfg.signature_present;
            let trusted = signature
                .signer
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map_or(false, |s| registry.contains_name(s));
            if trusted {
                score += cfg.trusted_signer;
            } else {
                score -= cfg.untrusted_signer;
            }
            signature.trusted = trusted;
        }

        let identity = self.identity.extract(text);
        let mut broker_verified = false;
        if let Some((name, registration_number)) = identity.pair() {
            if registry.contains_pair(name, registration_number) {
                score += cfg.broker_verified;
                broker_verified = true;
            } else {
                score -= cfg.broker_mismatch;
            }
        }

        let mut legitimacy_score = round2(score);
        if cfg.clamp {
            legitimacy_score = legitimacy_score.clamp(0.0, 1.0);
        }

        debug!(
            signature_present = signature.present,
            signer_trusted = signature.trusted,
            broker_verified,
            legitimacy_score,
            "Legitimacy assessed"
        );

        LegitimacyAssessment {
            legitimacy_score,
            broker_verified,
            signature,
            broker: (identity.name.is_some() || identity.registration_number.is_some())
                .then_some(identity),
        }
    }

    /// Neutral result used when verification could not run.
    pub fn degraded(&self) -> LegitimacyAssessment {
        LegitimacyAssessment {
            legitimacy_score: self.config.base,
            broker_verified: false,
            signature: SignatureInfo::default(),
            broker: None,
        }
    }
}
