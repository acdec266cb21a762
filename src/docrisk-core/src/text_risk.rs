//! Phishing-language risk scoring over extracted text.
//!
//! Text is cut into fixed-size character chunks, each chunk is classified
//! once, and the mean phishing probability is mapped onto a 0-100 score.
//! Below the detection threshold the score is dampened to keep borderline
//! documents from reading as scams.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crate::classifier::PhishingClassifier;
use crate::config::TextRiskConfig;
use crate::error::AssessError;
use crate::types::TextRiskReport;

/// Signal emitted when there is nothing to classify.
pub const NO_TEXT_SIGNAL: &str = "no_text_detected";

/// Signal emitted when the text component degraded.
pub const TEXT_UNAVAILABLE_SIGNAL: &str = "text_analysis_unavailable";

/// Split text into contiguous chunks of at most `max_chars` characters.
///
/// Boundaries depend only on the input, so identical text always yields
/// identical chunks. Only the last chunk may be shorter.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}

/// Outcome of the threshold policy for one document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextVerdict {
    /// Mean phishing probability across chunks.
    pub avg_phishing_prob: f64,
    /// Integer risk in [0, 100].
    pub risk_score: u8,
    /// Average exceeded the threshold.
    pub scam_detected: bool,
}

impl TextVerdict {
    /// Apply the threshold policy to a mean phishing probability.
    pub fn from_probability(avg_phishing_prob: f64, config: &TextRiskConfig) -> Self {
        let avg = avg_phishing_prob.clamp(0.0, 1.0);
        let scam_detected = avg > config.phishing_threshold;
        let scale = if scam_detected {
            config.detected_scale
        } else {
            config.dampened_scale
        };
        let risk_score = (avg * scale).round().clamp(0.0, 100.0) as u8;
        Self {
            avg_phishing_prob: avg,
            risk_score,
            scam_detected,
        }
    }

    /// Convert into the report shape.
    pub fn into_report(self) -> TextRiskReport {
        TextRiskReport {
            risk_score: self.risk_score,
            signals: vec![
                format!("ocr_text_scam_score: {:.2}", self.avg_phishing_prob),
                format!("scam_detected: {}", self.scam_detected),
            ],
        }
    }
}

/// Scores extracted text with an injected phishing classifier.
pub struct TextRiskAnalyzer {
    config: TextRiskConfig,
    classifier: Arc<dyn PhishingClassifier>,
    chunk_timeout: Duration,
}

impl TextRiskAnalyzer {
    /// Create an analyzer around a shared classifier handle.
    pub fn new(
        config: TextRiskConfig,
        classifier: Arc<dyn PhishingClassifier>,
        chunk_timeout: Duration,
    ) -> Self {
        Self {
            config,
            classifier,
            chunk_timeout,
        }
    }

    /// Score `text` against the configured threshold.
    pub async fn analyze(&self, text: &str) -> Result<TextRiskReport, AssessError> {
        self.analyze_with_threshold(text, self.config.phishing_threshold)
            .await
    }

    /// Score `text` against an explicit threshold.
    #[instrument(skip(self, text), fields(classifier = self.classifier.name(), chars = text.len()))]
    pub async fn analyze_with_threshold(
        &self,
        text: &str,
        threshold: f64,
    ) -> Result<TextRiskReport, AssessError> {
        if text.trim().is_empty() {
            debug!("No text to classify");
            return Ok(no_text_report());
        }

        let chunks = chunk_text(text, self.config.chunk_size);
        let total = chunks.len();

        let probabilities: Vec<f64> = stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, chunk)| self.classify_chunk(idx, chunk))
            .buffered(self.config.classifier_concurrency.max(1))
            .try_collect()
            .await?;

        let avg = probabilities.iter().sum::<f64>() / total as f64;
        let policy = TextRiskConfig {
            phishing_threshold: threshold,
            ..self.config.clone()
        };
        let verdict = TextVerdict::from_probability(avg, &policy);

        debug!(
            chunks = total,
            avg_phishing_prob = verdict.avg_phishing_prob,
            risk_score = verdict.risk_score,
            scam_detected = verdict.scam_detected,
            "Text risk scored"
        );
        Ok(verdict.into_report())
    }

    async fn classify_chunk(&self, idx: usize, chunk: &str) -> Result<f64, AssessError> {
        match tokio::time::timeout(self.chunk_timeout, self.classifier.classify(chunk)).await {
            Ok(Ok(c)) => Ok(c.phishing_probability()),
            Ok(Err(e)) => Err(AssessError::classification(format!("chunk {}: {}", idx, e))),
            Err(_) => Err(AssessError::Timeout {
                stage: format!("classifier chunk {}", idx),
                after: self.chunk_timeout,
            }),
        }
    }

    /// Release the classifier.
    pub async fn shutdown(&self) {
        self.classifier.shutdown().await;
    }
}

/// Report for empty or whitespace-only text.
pub fn no_text_report() -> TextRiskReport {
    TextRiskReport {
        risk_score: 0,
        signals: vec![NO_TEXT_SIGNAL.to_string()],
    }
}

/// Report used when the text component cannot be computed.
pub fn degraded_report() -> TextRiskReport {
    TextRiskReport {
        risk_score: 0,
        signals: vec![TEXT_UNAVAILABLE_SIGNAL.to_string()],
    }
}
