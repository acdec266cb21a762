//! Error types for assessment operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Which collaborator produced an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Plain text (text layer or OCR).
    Text,
    /// Document metadata dictionary.
    Metadata,
    /// Digital signature annotations.
    Signature,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Metadata => f.write_str("metadata"),
            Self::Signature => f.write_str("signature"),
        }
    }
}

/// Errors that can occur during a risk assessment.
#[derive(Debug, Error)]
pub enum AssessError {
    /// Document missing or unreadable.
    #[error("Cannot read document {path}: {reason}")]
    Input {
        /// Path that was opened.
        path: PathBuf,
        /// Reason the document is unusable.
        reason: String,
    },

    /// A collaborator failed to extract an artifact.
    #[error("{kind} extraction failed: {message}")]
    Extraction {
        /// Artifact being extracted.
        kind: ArtifactKind,
        /// Error message.
        message: String,
    },

    /// Phishing classifier unavailable or failed.
    #[error("Classification failed: {message}")]
    Classification {
        /// Error message.
        message: String,
    },

    /// A stage exceeded its time budget.
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        /// Stage that timed out.
        stage: String,
        /// Budget that was exceeded.
        after: Duration,
    },

    /// Broker registry unreachable or malformed.
    #[error("Registry error: {0}")]
    Registry(#[from] docrisk_registry::RegistryError),

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// The result could not be rendered for output.
    #[error("Cannot render output: {0}")]
    Output(#[from] serde_json::Error),

    /// No artifact at all could be extracted from the document.
    #[error("No content could be extracted from the document ({details})")]
    NoContent {
        /// Per-artifact failure summary.
        details: String,
    },
}

impl AssessError {
    /// Shorthand for an extraction failure.
    pub fn extraction(kind: ArtifactKind, message: impl Into<String>) -> Self {
        Self::Extraction {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a classification failure.
    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification {
            message: message.into(),
        }
    }

    /// Check if this error is the caller's fault (bad document or flags).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Input { .. } | Self::Config { .. })
    }

    /// Check if this error can be absorbed by degrading one component
    /// instead of failing the whole assessment.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Extraction { .. }
                | Self::Classification { .. }
                | Self::Timeout { .. }
                | Self::Registry(_)
        )
    }

    /// Process exit code for the CLI.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_input_error() {
            2
        } else {
            3
        }
    }
}
