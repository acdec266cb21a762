//! Weighted combination of the three component scores.
//!
//! The aggregator is a pure function of its inputs. Components are put on a
//! common 0-100 risk scale first:
//!
//! ```text
//! ocr_component          = text risk score
//! modification_component = 100 if tampered else 0
//! legitimacy_component   = (1 - legitimacy) * 100
//! ```
//!
//! and then weighted by the table selected by the tamper flag.

use serde::{Deserialize, Serialize};

use crate::config::WeightConfig;
use crate::error::AssessError;
use crate::legitimacy::VERIFICATION_UNAVAILABLE_SIGNAL;
use crate::tamper::TAMPER_UNAVAILABLE_SIGNAL;
use crate::types::{Component, DegradedComponent, RiskAssessment, TextRiskReport};

/// Tolerance for the weights-sum-to-one check.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// One weight set. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    /// Weight of the text risk component.
    pub ocr: f64,
    /// Weight of the tamper component.
    pub modification: f64,
    /// Weight of the legitimacy component.
    pub legitimacy: f64,
}

impl WeightTable {
    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.ocr + self.modification + self.legitimacy
    }

    /// Reject negative weights and tables that do not sum to 1.0.
    pub fn validate(&self, label: &str) -> Result<(), AssessError> {
        if [self.ocr, self.modification, self.legitimacy]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(AssessError::Config {
                message: format!("{} weights must be finite and non-negative", label),
            });
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AssessError::Config {
                message: format!("{} weights must sum to 1.0, got {}", label, sum),
            });
        }
        Ok(())
    }
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Combines component outputs into the final assessment.
#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    weights: WeightConfig,
}

impl RiskAggregator {
    /// Create an aggregator with the given weight tables.
    pub fn new(weights: WeightConfig) -> Self {
        Self { weights }
    }

    /// Weight table selected by the tamper flag.
    pub fn weights_for(&self, tamper_flag: bool) -> &WeightTable {
        if tamper_flag {
            &self.weights.tampered
        } else {
            &self.weights.clean
        }
    }

    /// Weighted risk score, rounded to two decimals.
    pub fn score(&self, ocr_score: u8, tamper_flag: bool, legitimacy_score: f64) -> f64 {
        let weights = self.weights_for(tamper_flag);
        let ocr_component = f64::from(ocr_score);
        let modification_component = if tamper_flag { 100.0 } else { 0.0 };
        let legitimacy_component = (1.0 - legitimacy_score) * 100.0;

        round2(
            weights.ocr * ocr_component
                + weights.modification * modification_component
                + weights.legitimacy * legitimacy_component,
        )
    }

    /// Build the final assessment.
    ///
    /// Signals are the text signals in order, then the tamper flag, then
    /// the legitimacy score, then one entry per degraded component. A
    /// degraded tamper or legitimacy component also gets its marker right
    /// after its own line.
    pub fn combine(
        &self,
        text: &TextRiskReport,
        tamper_flag: bool,
        legitimacy_score: f64,
        degraded: &[DegradedComponent],
    ) -> RiskAssessment {
        let risk_score = self.score(text.risk_score, tamper_flag, legitimacy_score);
        let is_degraded = |c: Component| degraded.iter().any(|d| d.component == c);

        let mut signals = Vec::with_capacity(text.signals.len() + 4 + degraded.len());
        signals.extend(text.signals.iter().cloned());
        signals.push(format!("document_modified: {}", tamper_flag));
        if is_degraded(Component::Tamper) {
            signals.push(TAMPER_UNAVAILABLE_SIGNAL.to_string());
        }
        signals.push(format!("legitimacy_score: {:.2}", legitimacy_score));
        if is_degraded(Component::Legitimacy) {
            signals.push(VERIFICATION_UNAVAILABLE_SIGNAL.to_string());
        }
        signals.extend(degraded.iter().map(DegradedComponent::signal));

        RiskAssessment {
            risk_score,
            signals,
        }
    }
}
