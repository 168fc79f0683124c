//! Type-safe wrappers and core types for vector search functionality.
//!
//! This module provides newtypes and error types following the project's
//! strict type safety guidelines. All types implement necessary traits
//! for ergonomic usage while preventing primitive obsession.

use thiserror::Error;

/// Standard vector dimension for CLAP-style audio/text embeddings.
pub const VECTOR_DIMENSION_512: usize = 512;

/// Epsilon added to vector norms before division so zero vectors do not
/// produce NaN components.
pub const NORM_EPSILON: f32 = 1e-8;

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent dimension
/// mismatches between the embedding provider and persisted artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Creates a standard 512-dimensional vector dimension.
    #[must_use]
    pub const fn dimension_512() -> Self {
        Self(VECTOR_DIMENSION_512)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Normalized similarity score in [0, 1], derived from a raw cosine
/// similarity in [-1, 1] via `(raw + 1) / 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity(f32);

impl Similarity {
    /// Maps a raw inner-product score in [-1, 1] to [0, 1], clamping any
    /// floating drift outside the target range.
    #[must_use]
    pub fn from_raw(raw: f32) -> Self {
        Self(((raw + 1.0) / 2.0).clamp(0.0, 1.0))
    }

    /// Returns the underlying f32 value.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.0
    }
}

/// L2-normalizes a vector in place, using [`NORM_EPSILON`] to guard against
/// division by zero.
pub fn normalize_in_place(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm + NORM_EPSILON;
    for value in vector.iter_mut() {
        *value /= denom;
    }
}

/// Inner product of two equal-length vectors. For unit-normalized inputs
/// this equals their cosine similarity, range [-1, 1].
#[must_use]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure the artifacts were generated with the same embedding model the server is configured for"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Storage(#[from] std::io::Error),

    #[error(
        "Invalid artifact format: {0}\nSuggestion: Regenerate the corpus artifacts with the offline embedding job"
    )]
    InvalidFormat(String),

    #[error(
        "Invalid artifact version: expected {expected}, got {actual}\nSuggestion: Regenerate the corpus artifacts with the current format"
    )]
    VersionMismatch { expected: u32, actual: u32 },

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    EmbeddingFailed(String),

    #[error("Metadata error: {0}")]
    Metadata(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_dimension() {
        let dim = VectorDimension::new(512).unwrap();
        assert_eq!(dim.get(), 512);

        let standard = VectorDimension::dimension_512();
        assert_eq!(standard.get(), 512);

        assert!(VectorDimension::new(0).is_err());

        let vec = vec![0.1; 512];
        assert!(dim.validate_vector(&vec).is_ok());

        let wrong_vec = vec![0.1; 100];
        assert!(dim.validate_vector(&wrong_vec).is_err());
    }

    #[test]
    fn test_similarity_mapping() {
        assert!((Similarity::from_raw(1.0).get() - 1.0).abs() < f32::EPSILON);
        assert!((Similarity::from_raw(-1.0).get() - 0.0).abs() < f32::EPSILON);
        assert!((Similarity::from_raw(0.0).get() - 0.5).abs() < f32::EPSILON);
        assert!((Similarity::from_raw(0.93).get() - 0.965).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_clamps_floating_drift() {
        assert_eq!(Similarity::from_raw(1.000001).get(), 1.0);
        assert_eq!(Similarity::from_raw(-1.000001).get(), 0.0);
    }

    #[test]
    fn test_normalize_in_place() {
        let mut v = vec![3.0, 4.0];
        normalize_in_place(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_zero_vector_is_finite() {
        let mut v = vec![0.0; 8];
        normalize_in_place(&mut v);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_inner_product_of_unit_vectors_is_cosine() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((inner_product(&a, &b) - 0.0).abs() < f32::EPSILON);
        assert!((inner_product(&a, &a) - 1.0).abs() < f32::EPSILON);
    }
}
