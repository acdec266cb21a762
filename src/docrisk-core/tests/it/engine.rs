//! End-to-end engine scenarios with in-process collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use docrisk_core::classifier::{Classification, Label, PhishingClassifier};
use docrisk_core::{
    AssessConfig, AssessError, AssessmentEngine, BrokerIdentity, Collaborators, Component,
    Document, IdentityExtractor, MetadataExtractor, MetadataMap, SignatureEvidence,
    SignatureInspector, TextExtractor,
};
use docrisk_registry::{BrokerRecord, BrokerRegistry, RegistryHandle};

const CERTIFICATE_TEXT: &str =
    "Certificate of Registration\nBroker Name: ALPHA SECURITIES\nNo. INZ00000101\n";

/// Serves fixed artifacts; `None` fails that artifact.
#[derive(Clone, Default)]
struct FakeExtractor {
    text: Option<String>,
    metadata: Option<MetadataMap>,
    signature: Option<SignatureEvidence>,
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract_text(&self, _document: &Document) -> Result<String, AssessError> {
        self.text.clone().ok_or_else(|| {
            AssessError::extraction(docrisk_core::ArtifactKind::Text, "OCR engine crashed")
        })
    }
}

#[async_trait]
impl MetadataExtractor for FakeExtractor {
    async fn extract_metadata(&self, _document: &Document) -> Result<MetadataMap, AssessError> {
        self.metadata.clone().ok_or_else(|| {
            AssessError::extraction(docrisk_core::ArtifactKind::Metadata, "no info dictionary")
        })
    }
}

#[async_trait]
impl SignatureInspector for FakeExtractor {
    async fn inspect_signature(
        &self,
        _document: &Document,
    ) -> Result<SignatureEvidence, AssessError> {
        self.signature.clone().ok_or_else(|| {
            AssessError::extraction(docrisk_core::ArtifactKind::Signature, "pdfsig missing")
        })
    }
}

/// Never returns.
struct StalledMetadata;

#[async_trait]
impl MetadataExtractor for StalledMetadata {
    async fn extract_metadata(&self, _document: &Document) -> Result<MetadataMap, AssessError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(MetadataMap::new())
    }
}

/// Fixed verdict for every chunk; counts calls and shutdowns.
struct FixedClassifier {
    label: Label,
    confidence: f64,
    calls: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl FixedClassifier {
    fn new(label: Label, confidence: f64) -> Arc<Self> {
        Arc::new(Self {
            label,
            confidence,
            calls: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PhishingClassifier for FixedClassifier {
    async fn classify(&self, _chunk: &str) -> Result<Classification, AssessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Classification::new(self.label, self.confidence))
    }

    fn name(&self) -> &str {
        "fixed"
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

fn clean_metadata() -> MetadataMap {
    [
        ("Author", "Registrar of Brokers"),
        ("Producer", "ReportLab PDF Library"),
        ("CreationDate", "D:20240105100000Z"),
        ("ModDate", "D:20240105100000Z"),
    ]
    .into_iter()
    .collect()
}

fn edited_metadata() -> MetadataMap {
    [
        ("Author", "Registrar of Brokers"),
        ("Producer", "Adobe Photoshop 2024"),
        ("CreationDate", "D:20240105100000Z"),
        ("ModDate", "D:20240301120000Z"),
    ]
    .into_iter()
    .collect()
}

fn genuine() -> FakeExtractor {
    FakeExtractor {
        text: Some(CERTIFICATE_TEXT.into()),
        metadata: Some(clean_metadata()),
        signature: Some(SignatureEvidence {
            present: true,
            signer: Some("Registrar CA".into()),
        }),
    }
}

fn registry() -> Arc<RegistryHandle> {
    Arc::new(RegistryHandle::new(BrokerRegistry::from_records(vec![
        BrokerRecord::new("ALPHA SECURITIES", "INZ00000101"),
        BrokerRecord::new("Registrar CA", "INZ00000999"),
    ])))
}

/// A real file for the document handle; content only feeds the digest.
fn document() -> (TempDir, Document) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("certificate.pdf");
    std::fs::write(&path, b"%PDF-1.7 test certificate").unwrap();
    let doc = Document::open(&path).unwrap();
    (dir, doc)
}

fn engine(extractor: FakeExtractor) -> AssessmentEngine {
    AssessmentEngine::new(AssessConfig::default(), Collaborators::uniform(extractor)).unwrap()
}

#[tokio::test]
async fn genuine_document_scores_zero() {
    let (_dir, doc) = document();
    let engine = engine(genuine())
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(registry());

    let report = engine.assess(&doc).await.unwrap();

    assert_eq!(report.assessment.risk_score, 0.0);
    assert_eq!(
        report.assessment.signals,
        vec![
            "ocr_text_scam_score: 0.00",
            "scam_detected: false",
            "document_modified: false",
            "legitimacy_score: 1.00",
        ]
    );
    assert!(report.degraded.is_empty());
    assert!(report.legitimacy.broker_verified);
    assert!(report.legitimacy.signature.trusted);
    assert_eq!(report.document_sha256.len(), 64);
}

#[tokio::test]
async fn edited_scam_document_scores_high() {
    let (_dir, doc) = document();
    let extractor = FakeExtractor {
        text: Some("Guaranteed returns, send your PAN and OTP today".into()),
        metadata: Some(edited_metadata()),
        signature: Some(SignatureEvidence::default()),
    };
    let engine = engine(extractor)
        .with_classifier(FixedClassifier::new(Label::Phishing, 0.95))
        .with_registry(registry());

    let report = engine.assess(&doc).await.unwrap();

    // 0.25*95 + 0.50*100 + 0.25*50
    assert_eq!(report.assessment.risk_score, 86.25);
    assert!(report.tamper.flag);
    assert_eq!(
        report.tamper.reasons,
        vec![
            "modification date differs from creation date",
            "suspicious software detected in metadata: Adobe Photoshop 2024",
        ]
    );
    assert_eq!(report.text.risk_score, 95);
    assert!(report
        .assessment
        .signals
        .contains(&"scam_detected: true".to_string()));
}

#[tokio::test]
async fn missing_classifier_degrades_text() {
    let (_dir, doc) = document();
    let engine = engine(genuine()).with_registry(registry());

    let report = engine.assess(&doc).await.unwrap();

    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].component, Component::TextRisk);
    assert_eq!(report.text.risk_score, 0);
    assert_eq!(
        report.assessment.signals,
        vec![
            "text_analysis_unavailable",
            "document_modified: false",
            "legitimacy_score: 1.00",
            "degraded: text_risk (classifier not configured)",
        ]
    );
}

#[tokio::test]
async fn empty_text_needs_no_classifier() {
    let (_dir, doc) = document();
    let classifier = FixedClassifier::new(Label::Phishing, 1.0);
    let extractor = FakeExtractor {
        text: Some("   \n".into()),
        ..genuine()
    };
    let engine = engine(extractor)
        .with_classifier(classifier.clone())
        .with_registry(registry());

    let report = engine.assess(&doc).await.unwrap();

    assert_eq!(report.text.signals, vec!["no_text_detected"]);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    assert!(report.degraded.is_empty());
}

#[tokio::test]
async fn metadata_failure_degrades_tamper_only() {
    let (_dir, doc) = document();
    let extractor = FakeExtractor {
        metadata: None,
        ..genuine()
    };
    let engine = engine(extractor)
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(registry());

    let report = engine.assess(&doc).await.unwrap();

    assert!(!report.tamper.flag);
    assert!(report.tamper.reasons.is_empty());
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].component, Component::Tamper);
    assert!(report
        .assessment
        .signals
        .contains(&"tamper_check_unavailable".to_string()));
    assert_eq!(report.legitimacy.legitimacy_score, 1.0);
}

#[tokio::test]
async fn unavailable_registry_degrades_legitimacy() {
    let (_dir, doc) = document();
    let engine = engine(genuine())
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(Arc::new(RegistryHandle::unavailable("broker_db.sqlite missing")));

    let report = engine.assess(&doc).await.unwrap();

    assert_eq!(report.legitimacy.legitimacy_score, 0.5);
    assert!(!report.legitimacy.broker_verified);
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].component, Component::Legitimacy);
    // 0.40*0 + 0.20*0 + 0.40*50
    assert_eq!(report.assessment.risk_score, 20.0);
    assert!(report
        .assessment
        .signals
        .contains(&"verification_unavailable".to_string()));
}

#[tokio::test]
async fn text_failure_skips_identity_but_keeps_signature() {
    let (_dir, doc) = document();
    let extractor = FakeExtractor {
        text: None,
        ..genuine()
    };
    let engine = engine(extractor)
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(registry());

    let report = engine.assess(&doc).await.unwrap();

    // Signature still counts: 0.5 + 0.2 + 0.3
    assert_eq!(report.legitimacy.legitimacy_score, 1.0);
    assert!(!report.legitimacy.broker_verified);
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].component, Component::TextRisk);
    assert!(report.degraded[0].reason.contains("OCR engine crashed"));
}

#[tokio::test]
async fn nothing_extracted_is_fatal() {
    let (_dir, doc) = document();
    let engine = engine(FakeExtractor::default()).with_registry(registry());

    let err = engine.assess(&doc).await.unwrap_err();

    assert!(matches!(err, AssessError::NoContent { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("pdfsig missing"));
}

#[tokio::test(start_paused = true)]
async fn stalled_extraction_hits_deadline() {
    let (_dir, doc) = document();
    let mut config = AssessConfig::default();
    config.deadline.total_secs = 5;
    let fake = Arc::new(genuine());
    let collaborators = Collaborators {
        text: fake.clone(),
        metadata: Arc::new(StalledMetadata),
        signature: fake,
    };
    let engine = AssessmentEngine::new(config, collaborators)
        .unwrap()
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(registry());

    let report = engine.assess(&doc).await.unwrap();

    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].component, Component::Tamper);
    assert!(report.degraded[0].reason.contains("timed out"));
}

#[tokio::test]
async fn published_snapshot_is_used_by_next_assessment() {
    let (_dir, doc) = document();
    let handle = Arc::new(RegistryHandle::new(BrokerRegistry::default()));
    let engine = engine(genuine())
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(handle.clone());

    let before = engine.assess(&doc).await.unwrap();
    assert!(!before.legitimacy.broker_verified);

    handle.publish(BrokerRegistry::from_records(vec![BrokerRecord::new(
        "ALPHA SECURITIES",
        "INZ00000101",
    )]));

    let after = engine.assess(&doc).await.unwrap();
    assert!(after.legitimacy.broker_verified);
    assert!(after.assessment.risk_score < before.assessment.risk_score);
}

#[tokio::test]
async fn concurrent_assessments_share_one_engine() {
    let (_dir, doc) = document();
    let classifier = FixedClassifier::new(Label::NotPhishing, 1.0);
    let engine = engine(genuine())
        .with_classifier(classifier.clone())
        .with_registry(registry());

    let runs = futures::future::join_all((0..8).map(|_| engine.assess(&doc))).await;

    let first = runs[0].as_ref().unwrap();
    for run in &runs {
        let report = run.as_ref().unwrap();
        assert_eq!(report.assessment, first.assessment);
    }
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 8);

    engine.shutdown().await;
    assert_eq!(classifier.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_document_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Document::open(dir.path().join("nope.pdf")).unwrap_err();
    assert!(err.is_input_error());
    assert_eq!(err.exit_code(), 2);
}

/// Reads a two-column `Broker | Reg. No.` table row instead of labels.
struct TableRowIdentity;

impl IdentityExtractor for TableRowIdentity {
    fn extract(&self, text: &str) -> BrokerIdentity {
        let row = text
            .lines()
            .find_map(|line| line.split_once('|'))
            .map(|(name, number)| (name.trim().to_string(), number.trim().to_string()));
        match row {
            Some((name, number)) => BrokerIdentity {
                name: Some(name),
                registration_number: Some(number),
            },
            None => BrokerIdentity::default(),
        }
    }
}

#[tokio::test]
async fn custom_identity_extractor_drives_broker_verification() {
    let (_dir, doc) = document();
    let extractor = FakeExtractor {
        text: Some("Registered broker\nALPHA SECURITIES | INZ00000101\n".into()),
        ..genuine()
    };

    // No "Name:" label, so the default patterns find no pair
    let labelled = engine(extractor.clone())
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(registry());
    let report = labelled.assess(&doc).await.unwrap();
    assert!(!report.legitimacy.broker_verified);

    let tabular = engine(extractor)
        .with_classifier(FixedClassifier::new(Label::NotPhishing, 1.0))
        .with_registry(registry())
        .with_identity_extractor(Arc::new(TableRowIdentity));
    let report = tabular.assess(&doc).await.unwrap();
    assert!(report.legitimacy.broker_verified);
    assert_eq!(
        report.legitimacy.broker,
        Some(BrokerIdentity {
            name: Some("ALPHA SECURITIES".into()),
            registration_number: Some("INZ00000101".into()),
        })
    );
}
