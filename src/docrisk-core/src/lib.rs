//! # docrisk-core
//!
//! Fraud risk scoring for submitted broker documents (registration
//! confirmations and similar). Three independent signals are combined into
//! one bounded score with human-readable justifications.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AssessmentEngine                         │
//! │                                                             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │TextExtractor │  │  Metadata    │  │   Signature      │   │
//! │  │ (OCR/layer)  │  │  Extractor   │  │   Inspector      │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! │         │                 │                   │             │
//! │         ▼                 ▼                   ▼             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ TextRisk     │  │  Tamper      │  │ SignatureRegistry│   │
//! │  │ Analyzer     │  │  Analyzer    │  │ Analyzer         │   │
//! │  │ (classifier) │  │ (heuristics) │  │ (BrokerRegistry) │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! │         └─────────────────┼───────────────────┘             │
//! │                           ▼                                 │
//! │  ┌───────────────────────────────────────────────────┐      │
//! │  │                 RiskAggregator                    │      │
//! │  │      (weight table keyed on the tamper flag)      │      │
//! │  └───────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Properties
//!
//! - **Degrade, don't abort**: a failing component falls back to a neutral
//!   value and is named in the signal list
//! - **Concurrent**: extraction and analysis each run as a single join
//!   under one deadline
//! - **Explained**: every score component carries at least one signal

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::pedantic)] // Too strict for production code
#![allow(clippy::missing_errors_doc)] // Error documentation not required
#![allow(clippy::module_name_repetitions)] // Allow Type in module::Type
#![allow(clippy::must_use_candidate)] // Not all functions need must_use

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod identity;
pub mod legitimacy;
pub mod tamper;
pub mod text_risk;
pub mod types;

pub use aggregator::{RiskAggregator, WeightTable};
pub use classifier::{Classification, HttpClassifier, Label, PhishingClassifier};
pub use config::AssessConfig;
pub use engine::{AssessmentEngine, Collaborators};
pub use error::{ArtifactKind, AssessError};
pub use extract::{
    BundleExtractor, Document, ExtractionBundle, ExtractorKind, MetadataExtractor,
    PopplerExtractor, SignatureInspector, TextExtractor,
};
pub use identity::{IdentityExtractor, RegexIdentityExtractor};
pub use legitimacy::SignatureRegistryAnalyzer;
pub use tamper::TamperAnalyzer;
pub use text_risk::TextRiskAnalyzer;
pub use types::{
    AssessmentReport, BrokerIdentity, Component, DegradedComponent, LegitimacyAssessment,
    MetadataMap, RiskAssessment, SignatureEvidence, SignatureInfo, TamperReport, TextRiskReport,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
