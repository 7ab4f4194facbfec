//! Unified Error Type
//!
//! Centralized error type for every tool in the crate.
//!
//! ## Design Principles
//!
//! - Single error enum (CodexError) shared by extraction, analysis, scanning and export
//! - Structured variants carry the offending path or record for better diagnostics
//! - Per-item failures inside a batch are collected, not raised (see scanner and python analyzer)

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodexError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Unsupported file type: {extension}")]
    UnsupportedFile { path: PathBuf, extension: String },

    // -------------------------------------------------------------------------
    // VBA Errors
    // -------------------------------------------------------------------------
    #[error("No VBA project found in {}", .0.display())]
    NoVbaProject(PathBuf),

    #[error("No VBA code found in {}", .0.display())]
    NoVbaCode(PathBuf),

    #[error("Extraction method '{0}' is not available")]
    BackendUnavailable(String),

    #[error("{backend} extraction failed: {message}")]
    Backend { backend: String, message: String },

    #[error("Decompression error at offset {offset}: {message}")]
    Decompression { offset: usize, message: String },

    #[error("Malformed dir stream: {0}")]
    DirStream(String),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CodexError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl CodexError {
    /// Create a not-found error for a path
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound(path.as_ref().to_path_buf())
    }

    /// Create an unsupported-file error, capturing the extension as seen by the user
    pub fn unsupported(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| "(none)".to_string());
        Self::UnsupportedFile {
            path: path.to_path_buf(),
            extension,
        }
    }

    /// Create a backend failure
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a decompression error at a byte offset
    pub fn decompression(offset: usize, message: impl Into<String>) -> Self {
        Self::Decompression {
            offset,
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Whether a different extraction backend could succeed where this one failed
    pub fn is_backend_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoVbaProject(_)
                | Self::Backend { .. }
                | Self::Decompression { .. }
                | Self::DirStream(_)
                | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension_display() {
        let err = CodexError::unsupported("report.pdf");
        assert_eq!(err.to_string(), "Unsupported file type: .pdf");

        let err = CodexError::unsupported("Makefile");
        assert_eq!(err.to_string(), "Unsupported file type: (none)");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CodexError = io_err.into();
        assert!(matches!(err, CodexError::Io(_)));
        assert!(err.is_backend_recoverable());
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(CodexError::NoVbaProject(PathBuf::from("a.xls")).is_backend_recoverable());
        assert!(CodexError::decompression(3, "bad").is_backend_recoverable());
        assert!(!CodexError::not_found("a.xls").is_backend_recoverable());
        assert!(!CodexError::NoVbaCode(PathBuf::from("a.xls")).is_backend_recoverable());
    }
}
