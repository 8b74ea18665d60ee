//! Error types for the extraction pipeline.
//!
//! This module defines all error types that can occur while turning a PDF
//! character stream into a layered text document.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during text extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (input file unreadable, output file not writable)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed PDF content (broken content stream, unreadable font)
    #[error("Malformed PDF '{path}' (page {page}): {reason}")]
    BadPdf {
        /// Path of the offending file
        path: String,
        /// 1-based page number where the error occurred
        page: u32,
        /// Reason for the failure
        reason: String,
    },

    /// Semantic-role model or BPE vocabulary missing or corrupt
    #[error("Failed to load model resource '{path}': {reason}")]
    ModelLoad {
        /// Path of the missing or corrupt resource
        path: String,
        /// Reason for the failure
        reason: String,
    },

    /// Byte sequence that cannot be mapped to UTF-8
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Output serialization failure
    #[error("Serialization error: {0}")]
    Serialize(String),
}
