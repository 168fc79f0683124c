//! Exact nearest-neighbor search over L2-normalized embedding vectors.
//!
//! The corpus is small (hundreds to low thousands of clips), so every
//! query scans all stored vectors and ranks them by inner product. No
//! approximate structure is built: exactness and explainability matter
//! more than scale here, and the O(N * D) scan stays well under a
//! millisecond at this corpus size.

use crate::vector::storage::CorpusItem;
use crate::vector::types::{VectorDimension, VectorError, inner_product, normalize_in_place};

/// Display metadata for one indexed clip, kept alongside its vector row.
#[derive(Debug, Clone)]
pub struct ClipMeta {
    pub filename: String,
    pub source_path: String,
}

/// One search match: the clip's position in insertion order plus its raw
/// cosine similarity in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub raw_score: f32,
}

/// In-memory exact-search index over one content type's corpus.
///
/// Built once from persisted artifacts and read-only afterwards. Vectors
/// are stored in one contiguous buffer, row-major, normalized to unit
/// length so the inner product with a unit query equals cosine similarity.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: VectorDimension,
    vectors: Vec<f32>,
    items: Vec<ClipMeta>,
}

impl VectorIndex {
    /// Builds an index from corpus items, replacing all prior content.
    ///
    /// Every embedding is validated against `dimension` and re-normalized
    /// to unit length; artifacts on disk are not trusted to be normalized.
    pub fn build(dimension: VectorDimension, items: Vec<CorpusItem>) -> Result<Self, VectorError> {
        let dim = dimension.get();
        let mut vectors = Vec::with_capacity(items.len() * dim);
        let mut metas = Vec::with_capacity(items.len());

        for item in items {
            dimension.validate_vector(&item.embedding)?;
            let mut embedding = item.embedding;
            normalize_in_place(&mut embedding);
            vectors.extend_from_slice(&embedding);
            metas.push(ClipMeta {
                filename: item.filename,
                source_path: item.source_path,
            });
        }

        Ok(Self {
            dimension,
            vectors,
            items: metas,
        })
    }

    /// An index with no content. Searching it returns no hits.
    #[must_use]
    pub fn empty(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Searches for the k most similar clips to a query vector.
    ///
    /// The query is normalized before scoring. Results are ordered by raw
    /// score descending; ties keep original insertion order (lower
    /// position wins) so repeated identical queries are deterministic.
    /// If `k` exceeds the corpus size, all clips are returned ranked.
    /// An empty index yields an empty result, not an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorError> {
        self.dimension.validate_vector(query)?;

        if self.items.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        normalize_in_place(&mut query);

        let dim = self.dimension.get();
        let mut hits: Vec<SearchHit> = self
            .items
            .iter()
            .enumerate()
            .map(|(position, _)| {
                let row = &self.vectors[position * dim..(position + 1) * dim];
                SearchHit {
                    position,
                    raw_score: inner_product(&query, row),
                }
            })
            .collect();

        // Descending by score, ascending by position on equal scores.
        hits.sort_by(|a, b| {
            b.raw_score
                .total_cmp(&a.raw_score)
                .then_with(|| a.position.cmp(&b.position))
        });
        hits.truncate(k.min(self.items.len()));

        Ok(hits)
    }

    /// Clip metadata at an insertion-order position.
    #[must_use]
    pub fn item(&self, position: usize) -> Option<&ClipMeta> {
        self.items.get(position)
    }

    /// Number of indexed clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dimension all stored vectors share.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}
