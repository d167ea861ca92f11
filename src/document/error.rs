//! Document error types
//!
//! Failures reported by a publication while decoding or serving content.

use thiserror::Error;

/// Unified document error type
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Container could not be read as a zip archive
    #[error("Failed to read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// IO error (std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally invalid package (no container, no package document)
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// XML could not be parsed
    #[error("XML error in {path}: {message}")]
    Xml { path: String, message: String },

    /// Resource not found (image, stylesheet, document)
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Reading-order position out of range
    #[error("Document not found: index {0}")]
    DocumentNotFound(usize),

    /// Invalid content (encoding, format)
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Chunking could not be performed
    #[error("Chunking error: {0}")]
    Chunking(String),
}

impl DocumentError {
    pub fn xml(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DocumentError::Xml {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;
