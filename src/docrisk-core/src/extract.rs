//! Document handle and extraction collaborators.
//!
//! Three independent capabilities feed the analyzers: text, metadata, and
//! signature evidence. Each is a trait so deployments can swap OCR or PDF
//! backends, and tests can inject in-process fakes.
//!
//! Two adapters ship with the crate:
//! - [`BundleExtractor`] reads a pre-extracted JSON bundle.
//! - [`PopplerExtractor`] shells out to the poppler command-line tools and
//!   falls back to tesseract OCR for scanned documents.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::config::ExtractionConfig;
use crate::error::{ArtifactKind, AssessError};
use crate::types::{MetadataMap, SignatureEvidence};

/// Suffix appended to a document path to locate its extraction bundle.
pub const BUNDLE_SUFFIX: &str = ".extract.json";

/// Read-only handle to the document under assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
}

impl Document {
    /// Open a document, failing if it does not exist or is not a file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AssessError> {
        let path = path.into();
        let meta = std::fs::metadata(&path).map_err(|e| AssessError::Input {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if !meta.is_file() {
            return Err(AssessError::Input {
                path,
                reason: "not a regular file".into(),
            });
        }
        Ok(Self { path })
    }

    /// Filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the document itself is a JSON extraction bundle.
    pub fn is_bundle(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    }

    /// Path of the sidecar bundle for this document.
    pub fn sidecar_path(&self) -> PathBuf {
        let mut raw = self.path.clone().into_os_string();
        raw.push(BUNDLE_SUFFIX);
        PathBuf::from(raw)
    }

    /// Hex SHA-256 of the document bytes.
    pub async fn sha256(&self) -> Result<String, AssessError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AssessError::Input {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Extracts plain text (text layer or OCR).
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extracted text, possibly empty.
    async fn extract_text(&self, document: &Document) -> Result<String, AssessError>;
}

/// Extracts the metadata dictionary.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Metadata fields, possibly none.
    async fn extract_metadata(&self, document: &Document) -> Result<MetadataMap, AssessError>;
}

/// Reports digital signature annotations.
#[async_trait]
pub trait SignatureInspector: Send + Sync {
    /// Signature presence and signer.
    async fn inspect_signature(&self, document: &Document)
        -> Result<SignatureEvidence, AssessError>;
}

/// Which adapter family to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Bundle if one exists for the document, else poppler.
    #[default]
    Auto,
    /// Pre-extracted JSON bundle.
    Bundle,
    /// Poppler command-line tools.
    Poppler,
}

impl ExtractorKind {
    /// Resolve `Auto` for a concrete document.
    pub fn resolve(self, document: &Document) -> Self {
        match self {
            Self::Auto if document.is_bundle() || document.sidecar_path().is_file() => {
                Self::Bundle
            },
            Self::Auto => Self::Poppler,
            other => other,
        }
    }
}

/// On-disk shape of an extraction bundle. Absent sections fail only the
/// matching artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionBundle {
    /// Extracted text.
    #[serde(default)]
    pub text: Option<String>,
    /// Metadata dictionary.
    #[serde(default)]
    pub metadata: Option<MetadataMap>,
    /// Signature evidence.
    #[serde(default)]
    pub signature: Option<SignatureEvidence>,
}

/// Reads artifacts from a pre-extracted JSON bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleExtractor;

impl BundleExtractor {
    /// Bundle location for a document.
    pub fn bundle_path(document: &Document) -> PathBuf {
        if document.is_bundle() {
            document.path().to_path_buf()
        } else {
            document.sidecar_path()
        }
    }

    async fn load(
        &self,
        document: &Document,
        kind: ArtifactKind,
    ) -> Result<ExtractionBundle, AssessError> {
        let path = Self::bundle_path(document);
        let raw = tokio::fs::read(&path).await.map_err(|e| {
            AssessError::extraction(kind, format!("cannot read bundle {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            AssessError::extraction(kind, format!("invalid bundle {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl TextExtractor for BundleExtractor {
    async fn extract_text(&self, document: &Document) -> Result<String, AssessError> {
        self.load(document, ArtifactKind::Text)
            .await?
            .text
            .ok_or_else(|| AssessError::extraction(ArtifactKind::Text, "bundle has no text"))
    }
}

#[async_trait]
impl MetadataExtractor for BundleExtractor {
    async fn extract_metadata(&self, document: &Document) -> Result<MetadataMap, AssessError> {
        self.load(document, ArtifactKind::Metadata)
            .await?
            .metadata
            .ok_or_else(|| AssessError::extraction(ArtifactKind::Metadata, "bundle has no metadata"))
    }
}

#[async_trait]
impl SignatureInspector for BundleExtractor {
    async fn inspect_signature(
        &self,
        document: &Document,
    ) -> Result<SignatureEvidence, AssessError> {
        self.load(document, ArtifactKind::Signature)
            .await?
            .signature
            .ok_or_else(|| {
                AssessError::extraction(ArtifactKind::Signature, "bundle has no signature section")
            })
    }
}

/// Runs `pdftotext`, `pdfinfo`, and `pdfsig`.
#[derive(Debug, Clone, Default)]
pub struct PopplerExtractor {
    config: ExtractionConfig,
}

/// Marker printed by `pdfsig` for unsigned documents.
const PDFSIG_UNSIGNED: &str = "does not contain any signatures";

impl PopplerExtractor {
    /// Create an extractor with the given program names and timeout.
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Run a tool and return its output. The child is killed on timeout.
    async fn run(
        &self,
        program: &str,
        args: &[&OsStr],
        kind: ArtifactKind,
    ) -> Result<ToolOutput, AssessError> {
        let timeout = self.config.timeout();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(AssessError::extraction(
                    kind,
                    format!("failed to run {}: {}", program, e),
                ))
            },
            Err(_) => {
                return Err(AssessError::Timeout {
                    stage: format!("{} extraction", kind),
                    after: timeout,
                })
            },
        };

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl PopplerExtractor {
    /// Rasterize every page and OCR it. Page texts are joined in page order.
    async fn ocr_pages(&self, document: &Document) -> Result<String, AssessError> {
        let scratch = tempfile::Builder::new()
            .prefix("docrisk-ocr")
            .tempdir()
            .map_err(|e| {
                AssessError::extraction(
                    ArtifactKind::Text,
                    format!("cannot create OCR scratch directory: {}", e),
                )
            })?;
        let prefix = scratch.path().join("page");
        let dpi = self.config.ocr_dpi.to_string();

        let rasterizer = &self.config.pdftoppm;
        self.run(
            rasterizer,
            &[
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-gray"),
                OsStr::new("-png"),
                document.path().as_os_str(),
                prefix.as_os_str(),
            ],
            ArtifactKind::Text,
        )
        .await?
        .require_success(rasterizer, ArtifactKind::Text)?;

        let pages = rendered_pages(scratch.path()).await?;
        if pages.is_empty() {
            return Err(AssessError::extraction(
                ArtifactKind::Text,
                format!("{} rendered no pages", rasterizer),
            ));
        }

        // tesseract binarizes internally (Otsu), grayscale input is enough
        let ocr = &self.config.tesseract;
        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            let mut args: Vec<&OsStr> = vec![page.as_os_str(), OsStr::new("-")];
            args.extend(self.config.tesseract_options.iter().map(OsStr::new));
            let text = self
                .run(ocr, &args, ArtifactKind::Text)
                .await?
                .require_success(ocr, ArtifactKind::Text)?;
            texts.push(text);
        }

        info!(pages = pages.len(), dpi = self.config.ocr_dpi, "OCR text extracted");
        Ok(texts.join("\n"))
    }
}

/// PNG pages written by the rasterizer, in page order.
async fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, AssessError> {
    let list_error = |e: std::io::Error| {
        AssessError::extraction(
            ArtifactKind::Text,
            format!("cannot list rendered pages: {}", e),
        )
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_error)?;
    let mut pages = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "png") {
            pages.push(path);
        }
    }
    // pdftoppm zero-pads page numbers, so name order is page order
    pages.sort();
    Ok(pages)
}

struct ToolOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl ToolOutput {
    fn require_success(self, program: &str, kind: ArtifactKind) -> Result<String, AssessError> {
        if self.success {
            return Ok(self.stdout);
        }
        let code = self
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        Err(AssessError::extraction(
            kind,
            format!("{} exited with {}: {}", program, code, self.stderr.trim()),
        ))
    }
}

#[async_trait]
impl TextExtractor for PopplerExtractor {
    #[instrument(skip(self, document), fields(path = %document.path().display()))]
    async fn extract_text(&self, document: &Document) -> Result<String, AssessError> {
        let program = &self.config.pdftotext;
        let out = self
            .run(
                program,
                &[
                    OsStr::new("-layout"),
                    document.path().as_os_str(),
                    OsStr::new("-"),
                ],
                ArtifactKind::Text,
            )
            .await?
            .require_success(program, ArtifactKind::Text)?;

        if out.trim().is_empty() && self.config.ocr_fallback {
            debug!("Text layer is blank, running OCR");
            return self.ocr_pages(document).await;
        }
        debug!(chars = out.len(), "Text layer extracted");
        Ok(out)
    }
}

#[async_trait]
impl MetadataExtractor for PopplerExtractor {
    #[instrument(skip(self, document), fields(path = %document.path().display()))]
    async fn extract_metadata(&self, document: &Document) -> Result<MetadataMap, AssessError> {
        let program = &self.config.pdfinfo;
        let out = self
            .run(
                program,
                &[OsStr::new("-isodates"), document.path().as_os_str()],
                ArtifactKind::Metadata,
            )
            .await?
            .require_success(program, ArtifactKind::Metadata)?;
        let metadata = parse_pdfinfo(&out);
        debug!(fields = metadata.len(), "Metadata extracted");
        Ok(metadata)
    }
}

#[async_trait]
impl SignatureInspector for PopplerExtractor {
    #[instrument(skip(self, document), fields(path = %document.path().display()))]
    async fn inspect_signature(
        &self,
        document: &Document,
    ) -> Result<SignatureEvidence, AssessError> {
        let program = &self.config.pdfsig;
        let out = self
            .run(program, &[document.path().as_os_str()], ArtifactKind::Signature)
            .await?;

        // pdfsig exits non-zero for unsigned files on some versions.
        if out.stdout.contains(PDFSIG_UNSIGNED) || out.stderr.contains(PDFSIG_UNSIGNED) {
            return Ok(SignatureEvidence::default());
        }
        let stdout = out.require_success(program, ArtifactKind::Signature)?;
        let evidence = parse_pdfsig(&stdout);
        debug!(present = evidence.present, signer = ?evidence.signer, "Signatures inspected");
        Ok(evidence)
    }
}

/// Parse `pdfinfo` output (`Key:   value` lines) into metadata.
pub fn parse_pdfinfo(output: &str) -> MetadataMap {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Parse `pdfsig` output into signature evidence. The signer is the
/// certificate common name of the first signature.
pub fn parse_pdfsig(output: &str) -> SignatureEvidence {
    if output.contains(PDFSIG_UNSIGNED) {
        return SignatureEvidence::default();
    }
    let present = output
        .lines()
        .any(|l| l.trim_start().starts_with("Signature #"));
    let signer = output
        .lines()
        .find_map(|l| l.split_once("Signer Certificate Common Name:"))
        .map(|(_, name)| name.trim().to_string())
        .filter(|name| !name.is_empty());
    SignatureEvidence { present, signer }
}
