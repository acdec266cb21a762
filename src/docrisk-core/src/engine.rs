//! Assessment engine.
//!
//! Runs one document through extraction, the three analyzers, and the
//! aggregator under a single deadline.
//!
//! ## Degradation
//!
//! A failing component falls back to a neutral value and is recorded in
//! the result instead of aborting:
//!
//! | Component  | Fallback                         | Marker                       |
//! |------------|----------------------------------|------------------------------|
//! | tamper     | flag false, no reasons           | `tamper_check_unavailable`   |
//! | text risk  | score 0                          | `text_analysis_unavailable`  |
//! | legitimacy | base score, broker unverified    | `verification_unavailable`   |
//!
//! Only a document from which nothing at all could be extracted fails the
//! assessment.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use docrisk_registry::RegistryHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregator::RiskAggregator;
use crate::classifier::PhishingClassifier;
use crate::config::AssessConfig;
use crate::error::AssessError;
use crate::extract::{
    BundleExtractor, Document, ExtractorKind, MetadataExtractor, PopplerExtractor,
    SignatureInspector, TextExtractor,
};
use crate::identity::{IdentityExtractor, RegexIdentityExtractor};
use crate::legitimacy::SignatureRegistryAnalyzer;
use crate::tamper::TamperAnalyzer;
use crate::text_risk::{degraded_report, no_text_report, TextRiskAnalyzer};
use crate::types::{
    AssessmentReport, Component, DegradedComponent, LegitimacyAssessment, MetadataMap,
    SignatureEvidence, TamperReport, TextRiskReport,
};

/// The three extraction capabilities.
#[derive(Clone)]
pub struct Collaborators {
    /// Text extraction.
    pub text: Arc<dyn TextExtractor>,
    /// Metadata extraction.
    pub metadata: Arc<dyn MetadataExtractor>,
    /// Signature inspection.
    pub signature: Arc<dyn SignatureInspector>,
}

impl Collaborators {
    /// Use one adapter for all three artifacts.
    pub fn uniform<E>(extractor: E) -> Self
    where
        E: TextExtractor + MetadataExtractor + SignatureInspector + 'static,
    {
        let shared = Arc::new(extractor);
        Self {
            text: shared.clone(),
            metadata: shared.clone(),
            signature: shared,
        }
    }

    /// Built-in adapters for a resolved extractor kind.
    pub fn for_kind(kind: ExtractorKind, config: &AssessConfig) -> Self {
        match kind {
            ExtractorKind::Bundle => Self::uniform(BundleExtractor),
            ExtractorKind::Auto | ExtractorKind::Poppler => {
                Self::uniform(PopplerExtractor::new(config.extraction.clone()))
            },
        }
    }
}

/// Raw artifacts from the extraction phase.
struct Extracted {
    text: Result<String, AssessError>,
    metadata: Result<MetadataMap, AssessError>,
    signature: Result<SignatureEvidence, AssessError>,
}

impl Extracted {
    fn nothing_extracted(&self) -> bool {
        self.text.is_err() && self.metadata.is_err() && self.signature.is_err()
    }

    fn failure_summary(&self) -> String {
        let describe = |r: Result<(), &AssessError>| match r {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        };
        format!(
            "text: {}; metadata: {}; signature: {}",
            describe(self.text.as_ref().map(|_| ())),
            describe(self.metadata.as_ref().map(|_| ())),
            describe(self.signature.as_ref().map(|_| ())),
        )
    }
}

/// Document risk assessment engine.
///
/// Holds the long-lived pieces (classifier handle, registry handle,
/// configuration) and is shared across concurrent assessments.
pub struct AssessmentEngine {
    config: AssessConfig,
    collaborators: Collaborators,
    tamper: TamperAnalyzer,
    text: Option<TextRiskAnalyzer>,
    legitimacy: SignatureRegistryAnalyzer,
    aggregator: RiskAggregator,
    registry: Option<Arc<RegistryHandle>>,
}

impl AssessmentEngine {
    /// Create an engine with no classifier and no registry. Those
    /// components degrade until supplied.
    pub fn new(config: AssessConfig, collaborators: Collaborators) -> Result<Self, AssessError> {
        config.validate()?;
        let identity: Arc<dyn IdentityExtractor> = Arc::new(RegexIdentityExtractor::new()?);

        info!(
            threshold = config.text.phishing_threshold,
            chunk_size = config.text.chunk_size,
            deadline_secs = config.deadline.total_secs,
            "AssessmentEngine: initializing"
        );

        Ok(Self {
            tamper: TamperAnalyzer::new(config.tamper.clone()),
            text: None,
            legitimacy: SignatureRegistryAnalyzer::new(config.legitimacy.clone(), identity),
            aggregator: RiskAggregator::new(config.weights.clone()),
            registry: None,
            collaborators,
            config,
        })
    }

    /// Attach the phishing classifier service.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn PhishingClassifier>) -> Self {
        info!(classifier = classifier.name(), "AssessmentEngine: classifier attached");
        self.text = Some(TextRiskAnalyzer::new(
            self.config.text.clone(),
            classifier,
            self.config.classifier.timeout(),
        ));
        self
    }

    /// Attach the broker registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RegistryHandle>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the broker identity extraction strategy.
    #[must_use]
    pub fn with_identity_extractor(mut self, identity: Arc<dyn IdentityExtractor>) -> Self {
        self.legitimacy = SignatureRegistryAnalyzer::new(self.config.legitimacy.clone(), identity);
        self
    }

    /// Effective configuration.
    pub fn config(&self) -> &AssessConfig {
        &self.config
    }

    /// Assess one document.
    ///
    /// Returns an error only when the document cannot be read or nothing
    /// could be extracted from it. Every other failure degrades a single
    /// component and is reported in [`AssessmentReport::degraded`].
    #[instrument(skip(self, document), fields(path = %document.path().display()))]
    pub async fn assess(&self, document: &Document) -> Result<AssessmentReport, AssessError> {
        let started = Instant::now();
        let budget = self.config.deadline.total();
        let deadline = started + budget;

        // 1. Extraction
        let (digest, text, metadata, signature) = tokio::join!(
            document.sha256(),
            within(deadline, budget, "text extraction", async {
                let result = self.collaborators.text.extract_text(document).await;
                log_extraction("text", &result);
                result
            }),
            within(deadline, budget, "metadata extraction", async {
                let result = self.collaborators.metadata.extract_metadata(document).await;
                log_extraction("metadata", &result);
                result
            }),
            within(deadline, budget, "signature inspection", async {
                let result = self.collaborators.signature.inspect_signature(document).await;
                log_extraction("signature", &result);
                result
            }),
        );
        let document_sha256 = digest?;
        let extracted = Extracted {
            text,
            metadata,
            signature,
        };

        if extracted.nothing_extracted() {
            let details = extracted.failure_summary();
            error!(details = %details, "No content could be extracted");
            return Err(AssessError::NoContent { details });
        }

        // 2. Analysis
        let text_for_identity = extracted.text.as_deref().unwrap_or("");
        let (tamper, text_risk, legitimacy) = tokio::join!(
            async { self.analyze_tamper(&extracted) },
            self.analyze_text(&extracted, deadline, budget),
            async { self.analyze_legitimacy(&extracted, text_for_identity) },
        );

        // 3. Aggregation
        let mut degraded = Vec::new();
        let tamper = tamper.unwrap_or_else(|reason| {
            degraded.push(DegradedComponent {
                component: Component::Tamper,
                reason,
            });
            TamperReport::default()
        });
        let text_risk = text_risk.unwrap_or_else(|reason| {
            degraded.push(DegradedComponent {
                component: Component::TextRisk,
                reason,
            });
            degraded_report()
        });
        let legitimacy = legitimacy.unwrap_or_else(|reason| {
            degraded.push(DegradedComponent {
                component: Component::Legitimacy,
                reason,
            });
            self.legitimacy.degraded()
        });

        let assessment = self.aggregator.combine(
            &text_risk,
            tamper.flag,
            legitimacy.legitimacy_score,
            &degraded,
        );

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            risk_score = assessment.risk_score,
            tampered = tamper.flag,
            text_risk = text_risk.risk_score,
            legitimacy = legitimacy.legitimacy_score,
            degraded = degraded.len(),
            elapsed_ms,
            "Assessment complete"
        );

        Ok(AssessmentReport {
            assessment,
            document_sha256,
            tamper,
            text: text_risk,
            legitimacy,
            degraded,
            elapsed_ms,
        })
    }

    fn analyze_tamper(&self, extracted: &Extracted) -> Result<TamperReport, String> {
        let metadata = extracted.metadata.as_ref().map_err(ToString::to_string)?;
        Ok(self.tamper.analyze(metadata))
    }

    async fn analyze_text(
        &self,
        extracted: &Extracted,
        deadline: Instant,
        budget: Duration,
    ) -> Result<TextRiskReport, String> {
        let text = extracted.text.as_deref().map_err(ToString::to_string)?;
        if text.trim().is_empty() {
            return Ok(no_text_report());
        }
        let analyzer = self
            .text
            .as_ref()
            .ok_or_else(|| "classifier not configured".to_string())?;

        within(deadline, budget, "text risk analysis", analyzer.analyze(text))
            .await
            .map_err(|e| {
                warn!("Text risk analysis failed: {}", e);
                e.to_string()
            })
    }

    fn analyze_legitimacy(
        &self,
        extracted: &Extracted,
        text: &str,
    ) -> Result<LegitimacyAssessment, String> {
        let evidence = extracted.signature.as_ref().map_err(ToString::to_string)?;
        let handle = self
            .registry
            .as_ref()
            .ok_or_else(|| "registry not configured".to_string())?;
        let snapshot = handle.snapshot().map_err(|e| {
            warn!("Registry snapshot unavailable: {}", e);
            AssessError::from(e).to_string()
        })?;
        Ok(self.legitimacy.analyze(evidence, text, &*snapshot))
    }

    /// Release the classifier. Classification may fail afterwards, which
    /// degrades the text component of later assessments.
    pub async fn shutdown(&self) {
        if let Some(text) = &self.text {
            text.shutdown().await;
            debug!("Classifier shut down");
        }
    }
}

/// Run `fut` against the shared deadline.
async fn within<T, F>(
    deadline: Instant,
    budget: Duration,
    stage: &str,
    fut: F,
) -> Result<T, AssessError>
where
    F: Future<Output = Result<T, AssessError>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(stage, "Deadline exceeded after {:?}", budget);
            Err(AssessError::Timeout {
                stage: stage.to_string(),
                after: budget,
            })
        },
    }
}

fn log_extraction<T>(artifact: &str, result: &Result<T, AssessError>) {
    match result {
        Ok(_) => debug!(artifact, "Extraction complete"),
        Err(e) => warn!(artifact, "Extraction failed: {}", e),
    }
}
