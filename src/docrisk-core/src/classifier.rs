//! Phishing text classifier seam.
//!
//! The classifier is expensive to bring up, so it is created once, shared
//! behind an `Arc`, and torn down explicitly with
//! [`PhishingClassifier::shutdown`]. Implementations must tolerate
//! concurrent `classify` calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ClassifierConfig;
use crate::error::AssessError;

/// Classifier verdict for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Scam / phishing language.
    Phishing,
    /// Anything else.
    NotPhishing,
}

impl Label {
    /// Map a model label string. Only `phishing` (any case) counts as phishing.
    pub fn from_model_label(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("phishing") {
            Self::Phishing
        } else {
            Self::NotPhishing
        }
    }
}

/// Label plus confidence in that label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Predicted label.
    pub label: Label,
    /// Confidence in `label`, within [0, 1].
    pub confidence: f64,
}

impl Classification {
    /// Create a classification, clamping confidence into [0, 1].
    pub fn new(label: Label, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }

    /// Probability that the chunk is phishing.
    pub fn phishing_probability(&self) -> f64 {
        match self.label {
            Label::Phishing => self.confidence,
            Label::NotPhishing => 1.0 - self.confidence,
        }
    }
}

/// Text classifier for phishing language.
#[async_trait]
pub trait PhishingClassifier: Send + Sync {
    /// Classify one bounded-length chunk.
    async fn classify(&self, chunk: &str) -> Result<Classification, AssessError>;

    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Release resources. Calls after shutdown may fail.
    async fn shutdown(&self) {}
}

/// Request body for a text-classification inference endpoint.
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    truncation: bool,
}

/// One scored label from the endpoint.
#[derive(Debug, Clone, Deserialize)]
struct ScoredLabel {
    label: String,
    score: f64,
}

/// Endpoints answer either `[{..}]` or `[[{..}]]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Flat(Vec<ScoredLabel>),
    Nested(Vec<Vec<ScoredLabel>>),
}

impl InferenceResponse {
    fn best(self) -> Option<ScoredLabel> {
        let labels = match self {
            Self::Flat(v) => v,
            Self::Nested(v) => v.into_iter().flatten().collect(),
        };
        labels
            .into_iter()
            .filter(|l| l.score.is_finite())
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Classifier backed by a remote text-classification endpoint.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpClassifier {
    /// Build the HTTP client for the configured endpoint.
    pub fn new(config: &ClassifierConfig) -> Result<Self, AssessError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| AssessError::Config {
            message: "classifier endpoint not configured".into(),
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("docrisk/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssessError::Config {
                message: format!("failed to create classifier client: {}", e),
            })?;

        info!(endpoint = %endpoint, "Phishing classifier client ready");

        Ok(Self {
            client,
            endpoint,
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl PhishingClassifier for HttpClassifier {
    #[instrument(skip(self, chunk), fields(chars = chunk.chars().count()))]
    async fn classify(&self, chunk: &str) -> Result<Classification, AssessError> {
        let mut request = self.client.post(&self.endpoint).json(&InferenceRequest {
            inputs: chunk,
            parameters: InferenceParameters { truncation: true },
        });
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AssessError::classification(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssessError::classification(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let parsed = response
            .json::<InferenceResponse>()
            .await
            .map_err(|e| AssessError::classification(format!("invalid response: {}", e)))?;

        let best = parsed
            .best()
            .ok_or_else(|| AssessError::classification("response contained no labels"))?;

        debug!(label = %best.label, score = best.score, "Chunk classified");
        Ok(Classification::new(
            Label::from_model_label(&best.label),
            best.score,
        ))
    }

    fn name(&self) -> &str {
        "http"
    }
}
