//! Error types for the audio retrieval service
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use crate::types::ContentType;
use thiserror::Error;

/// Main error type for search requests.
///
/// The taxonomy separates request-level failures (validation, embedding)
/// from deployment-level failures (missing index artifacts). Translation
/// degradation is deliberately absent: it is recovered into a warning field
/// on the response, never surfaced as an error.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A requested content type has no built index (artifacts missing or
    /// unreadable at startup).
    #[error(
        "No index built for content type '{content_type}'. Check that the artifacts directory contains a '{content_type}' subdirectory with vectors.bin and metadata.json"
    )]
    MissingIndex { content_type: ContentType },

    /// Configuration errors: bad paths, dimension mismatch between the
    /// embedding provider and the persisted artifacts, and similar.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// The embedding provider is unreachable, timed out, or returned
    /// malformed output. Fatal for the request.
    #[error("Embedding generation failed: {reason}")]
    Embedding { reason: String },

    /// Request rejected before any embedding or search work.
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    /// General errors for cases that do not fit the taxonomy above.
    #[error("{0}")]
    Internal(String),
}

impl SearchError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::MissingIndex { .. } => "MISSING_INDEX",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code this error maps to.
    ///
    /// Validation failures are client errors; everything else is a
    /// server-side condition.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            _ => 500,
        }
    }

    /// Convenience constructor for validation failures.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for embedding failures.
    pub fn embedding(reason: impl Into<String>) -> Self {
        Self::Embedding {
            reason: reason.into(),
        }
    }
}

impl From<crate::vector::VectorError> for SearchError {
    fn from(err: crate::vector::VectorError) -> Self {
        use crate::vector::VectorError;
        match err {
            VectorError::EmbeddingFailed(reason) => Self::Embedding { reason },
            VectorError::DimensionMismatch { expected, actual } => Self::Embedding {
                reason: format!("dimension mismatch: expected {expected}, got {actual}"),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type alias for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
