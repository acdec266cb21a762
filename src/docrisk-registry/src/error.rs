//! Error types for registry operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, ingesting, or querying the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registry file does not exist.
    #[error("Registry not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Registry file could not be read or written.
    #[error("Registry I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Registry contents do not match the expected schema.
    #[error("Malformed registry: {reason}")]
    Malformed {
        /// What was wrong with the contents.
        reason: String,
    },

    /// File extension does not map to a known registry backend.
    #[error("Unsupported registry format: {path}")]
    UnsupportedFormat {
        /// Offending path.
        path: PathBuf,
    },

    /// No snapshot has been published, or the last load failed.
    #[error("Registry unavailable: {reason}")]
    Unavailable {
        /// Why no snapshot can be served.
        reason: String,
    },

    /// Spreadsheet import source could not be parsed.
    #[error("Cannot read spreadsheet {path}: {reason}")]
    Sheet {
        /// Source file.
        path: PathBuf,
        /// Parser error.
        reason: String,
    },

    /// SQLite backend error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON backend error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Check if this error means the registry could not be reached at all,
    /// as opposed to being reachable but malformed.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Io { .. } | Self::Unavailable { .. }
        )
    }

    /// Check if this error points at bad registry contents.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. }
                | Self::Sheet { .. }
                | Self::Json(_)
                | Self::UnsupportedFormat { .. }
        )
    }
}
