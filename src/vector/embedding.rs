//! Embedding provider boundary for vector search.
//!
//! The retrieval pipeline consumes embeddings, it does not produce them:
//! the corpus side is embedded by an offline batch job (out of scope
//! here), and at serving time only query text needs embedding. This
//! module defines the provider trait plus a fastembed-backed
//! implementation and a deterministic mock for tests.

use crate::vector::types::{VectorDimension, VectorError};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;

/// Trait for generating text embeddings.
///
/// Implementations must be thread-safe; the orchestrator calls them from
/// blocking tasks under a bounded timeout.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input.
    ///
    /// Every returned vector must have exactly `dimension()` components;
    /// anything else is malformed provider output.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError>;

    /// Dimension of embeddings produced by this provider.
    #[must_use]
    fn dimension(&self) -> VectorDimension;
}

/// Parses a model name from configuration into a fastembed model.
///
/// Returns `None` for unknown names so the caller can produce a
/// configuration error listing the supported values.
#[must_use]
pub fn parse_embedding_model(name: &str) -> Option<(EmbeddingModel, usize)> {
    match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
        _ => None,
    }
}

/// FastEmbed-backed text embedding provider.
///
/// The model is downloaded to the cache directory on first use. fastembed
/// is synchronous, so the single model instance sits behind a mutex and
/// callers batch their texts into one call.
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    dimension: VectorDimension,
}

impl FastEmbedProvider {
    /// Create a provider for the named model, caching weights under
    /// `cache_dir`.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, VectorError> {
        let (model, dim) = parse_embedding_model(model_name).ok_or_else(|| {
            VectorError::EmbeddingFailed(format!(
                "Unknown embedding model '{model_name}'. Supported: all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5"
            ))
        })?;

        let embedding = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| VectorError::EmbeddingFailed(
            format!("Failed to initialize embedding model: {e}. Ensure you have internet connection for first-time model download")
        ))?;

        Ok(Self {
            model: Mutex::new(embedding),
            dimension: VectorDimension::new(dim)?,
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // fastembed expects Vec<String> for the embed method
        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                VectorError::EmbeddingFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(text_strings, None)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to generate embeddings: {e}"))
            })?;

        let expected = self.dimension.get();
        for embedding in &embeddings {
            if embedding.len() != expected {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}

/// Deterministic keyword-driven embedding provider.
///
/// Generates normalized vectors whose components depend on recognizable
/// terms in the text, useful for tests and offline development where
/// downloading a model is not an option.
pub struct MockEmbeddingProvider {
    dimension: VectorDimension,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingProvider {
    /// Create a mock provider with the standard 512 dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: VectorDimension::dimension_512(),
        }
    }

    /// Create a mock provider with a custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: VectorDimension) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        let dim = self.dimension.get();
        let mut embeddings = Vec::new();

        for text in texts {
            let lower = text.to_lowercase();
            let mut embedding = vec![0.05; dim];

            if lower.contains("rain") && dim > 1 {
                embedding[0] = 0.9;
                embedding[1] = 0.8;
            }
            if (lower.contains("thunder") || lower.contains("storm")) && dim > 3 {
                embedding[2] = 0.85;
                embedding[3] = 0.75;
            }
            if (lower.contains("music") || lower.contains("song")) && dim > 5 {
                embedding[4] = 0.9;
                embedding[5] = 0.7;
            }
            if lower.contains("piano") && dim > 7 {
                embedding[6] = 0.9;
                embedding[7] = 0.85;
            }

            crate::vector::types::normalize_in_place(&mut embedding);
            embeddings.push(embedding);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}
