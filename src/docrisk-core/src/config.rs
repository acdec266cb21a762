//! Configuration for the assessment engine.
//!
//! Every scoring constant lives here so tests and deployments can override
//! them without touching the analyzers. Values can be loaded from a TOML
//! file; missing keys fall back to [`Default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use docrisk_registry::MatchPolicy;
use serde::{Deserialize, Serialize};

use crate::aggregator::WeightTable;
use crate::error::AssessError;

/// Editing and conversion tools whose presence in metadata suggests the
/// document was altered after issue.
pub const DEFAULT_SUSPICIOUS_TOOLS: &[&str] = &[
    "Adobe Photoshop",
    "Adobe Illustrator",
    "Adobe Acrobat",
    "GIMP",
    "Inkscape",
    "CorelDRAW",
    "Paint.NET",
    "Affinity Photo",
    "Canva",
    "Sejda",
    "Smallpdf",
    "ILovePDF",
    "Foxit",
    "Nitro PDF",
    "PDFescape",
    "PDF-XChange",
    "Scribus",
    "Preview",
    "OpenOffice",
];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessConfig {
    /// Text-risk scoring.
    pub text: TextRiskConfig,
    /// Aggregator weight tables.
    pub weights: WeightConfig,
    /// Legitimacy scoring deltas.
    pub legitimacy: LegitimacyConfig,
    /// Tamper heuristics.
    pub tamper: TamperConfig,
    /// Broker registry location and matching.
    pub registry: RegistryConfig,
    /// Phishing classifier service.
    pub classifier: ClassifierConfig,
    /// Extraction collaborators.
    pub extraction: ExtractionConfig,
    /// Whole-assessment time budget.
    pub deadline: DeadlineConfig,
}

/// Text-risk scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRiskConfig {
    /// Average phishing probability above which a scam is declared.
    pub phishing_threshold: f64,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Score multiplier when a scam is detected.
    pub detected_scale: f64,
    /// Score multiplier below the threshold.
    pub dampened_scale: f64,
    /// Chunks classified concurrently. Results keep chunk order.
    pub classifier_concurrency: usize,
}

impl Default for TextRiskConfig {
    fn default() -> Self {
        Self {
            phishing_threshold: 0.85,
            chunk_size: 500,
            detected_scale: 100.0,
            dampened_scale: 70.0,
            classifier_concurrency: 1,
        }
    }
}

/// Weight tables selected by the tamper flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Used when the tamper flag is set.
    pub tampered: WeightTable,
    /// Used when the tamper flag is clear.
    pub clean: WeightTable,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            tampered: WeightTable {
                ocr: 0.25,
                modification: 0.50,
                legitimacy: 0.25,
            },
            clean: WeightTable {
                ocr: 0.40,
                modification: 0.20,
                legitimacy: 0.40,
            },
        }
    }
}

/// Additive legitimacy deltas. Penalties are stored as positive magnitudes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegitimacyConfig {
    /// Starting value ("unknown").
    pub base: f64,
    /// Added when any signature is present.
    pub signature_present: f64,
    /// Added when the signer is in the registry.
    pub trusted_signer: f64,
    /// Subtracted when the signer is missing or unknown.
    pub untrusted_signer: f64,
    /// Added when the broker pair matches the registry.
    pub broker_verified: f64,
    /// Subtracted when the broker pair does not match.
    pub broker_mismatch: f64,
    /// Clamp the final value into [0, 1].
    pub clamp: bool,
}

impl Default for LegitimacyConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            signature_present: 0.2,
            trusted_signer: 0.3,
            untrusted_signer: 0.2,
            broker_verified: 0.3,
            broker_mismatch: 0.2,
            clamp: true,
        }
    }
}

/// Metadata field names and tool denylist for tamper heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TamperConfig {
    /// Creation timestamp field.
    pub creation_field: String,
    /// Modification timestamp field.
    pub modification_field: String,
    /// Author field.
    pub author_field: String,
    /// Producer field.
    pub producer_field: String,
    /// Case-insensitive substrings flagged in any metadata value.
    pub suspicious_tools: Vec<String>,
}

impl Default for TamperConfig {
    fn default() -> Self {
        Self {
            creation_field: "CreationDate".into(),
            modification_field: "ModDate".into(),
            author_field: "Author".into(),
            producer_field: "Producer".into(),
            suspicious_tools: DEFAULT_SUSPICIOUS_TOOLS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Broker registry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry file (`.json` or SQLite).
    pub path: Option<PathBuf>,
    /// Lookup matching policy.
    pub match_policy: MatchPolicy,
}

/// Phishing classifier service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Text-classification endpoint URL.
    pub endpoint: Option<String>,
    /// Bearer token sent with each request.
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    /// Per-chunk request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

impl ClassifierConfig {
    /// Per-chunk request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External extraction tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Text-layer extraction program.
    pub pdftotext: String,
    /// Metadata extraction program.
    pub pdfinfo: String,
    /// Signature inspection program.
    pub pdfsig: String,
    /// OCR the rendered pages when the text layer is blank.
    pub ocr_fallback: bool,
    /// Page rasterizer used before OCR.
    pub pdftoppm: String,
    /// OCR program.
    pub tesseract: String,
    /// Rendering resolution for OCR.
    pub ocr_dpi: u32,
    /// Extra OCR engine options.
    pub tesseract_options: Vec<String>,
    /// Per-tool-invocation timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdftotext: "pdftotext".into(),
            pdfinfo: "pdfinfo".into(),
            pdfsig: "pdfsig".into(),
            ocr_fallback: true,
            pdftoppm: "pdftoppm".into(),
            tesseract: "tesseract".into(),
            ocr_dpi: 300,
            tesseract_options: ["--oem", "3", "--psm", "6"].map(String::from).to_vec(),
            timeout_secs: 60,
        }
    }
}

impl ExtractionConfig {
    /// Per-artifact extraction timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Overall assessment deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Budget for extraction plus analysis, in seconds.
    pub total_secs: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self { total_secs: 180 }
    }
}

impl DeadlineConfig {
    /// Whole-assessment budget.
    pub fn total(&self) -> Duration {
        Duration::from_secs(self.total_secs)
    }
}

impl AssessConfig {
    /// Load a configuration file, filling missing keys with defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, AssessError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AssessError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse a TOML configuration string.
    pub fn from_toml_str(raw: &str) -> Result<Self, AssessError> {
        let config: Self = toml::from_str(raw).map_err(|e| AssessError::Config {
            message: format!("invalid configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, AssessError> {
        toml::to_string_pretty(self).map_err(|e| AssessError::Config {
            message: e.to_string(),
        })
    }

    /// Check invariants the scoring code relies on.
    pub fn validate(&self) -> Result<(), AssessError> {
        let threshold = self.text.phishing_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AssessError::Config {
                message: format!("phishing_threshold must be within [0, 1], got {}", threshold),
            });
        }
        if self.text.chunk_size == 0 {
            return Err(AssessError::Config {
                message: "chunk_size must be positive".into(),
            });
        }
        if self.text.classifier_concurrency == 0 {
            return Err(AssessError::Config {
                message: "classifier_concurrency must be positive".into(),
            });
        }
        for (label, scale) in [
            ("detected_scale", self.text.detected_scale),
            ("dampened_scale", self.text.dampened_scale),
        ] {
            if !(0.0..=100.0).contains(&scale) {
                return Err(AssessError::Config {
                    message: format!("{} must be within [0, 100], got {}", label, scale),
                });
            }
        }
        self.weights.tampered.validate("tampered")?;
        self.weights.clean.validate("clean")?;
        if self.extraction.ocr_dpi == 0 {
            return Err(AssessError::Config {
                message: "extraction.ocr_dpi must be positive".into(),
            });
        }
        if self.deadline.total_secs == 0 {
            return Err(AssessError::Config {
                message: "deadline.total_secs must be positive".into(),
            });
        }
        Ok(())
    }
}
