//! Vector search functionality for semantic audio retrieval.
//!
//! This module provides exact inner-product search over L2-normalized
//! clip embeddings, the persisted artifact format those embeddings load
//! from, and the embedding provider boundary for query text.
//!
//! # Architecture
//! The corpus is static and small, so search is a brute-force scan per
//! index rather than an approximate structure. Artifacts are written
//! offline, memory-mapped at load, and immutable while serving.

mod embedding;
mod index;
mod storage;
mod types;

// Re-export core types for public API
pub use embedding::{
    EmbeddingProvider, FastEmbedProvider, MockEmbeddingProvider, parse_embedding_model,
};
pub use index::{ClipMeta, SearchHit, VectorIndex};
pub use storage::{
    CorpusArtifacts, CorpusItem, METADATA_FILE, VECTORS_FILE, load_artifacts, write_artifacts,
};
pub use types::{
    NORM_EPSILON, Similarity, VECTOR_DIMENSION_512, VectorDimension, VectorError, inner_product,
    normalize_in_place,
};
