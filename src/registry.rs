//! Registry owning one vector index per content type.
//!
//! The registry is the sole owner of all index data. Indexes are built at
//! startup from persisted artifacts and are read-only while serving; an
//! explicit reload builds fresh indexes off to the side and swaps them in
//! atomically, so in-flight searches always see a complete snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::{SearchError, SearchResult};
use crate::types::ContentType;
use crate::vector::{VectorDimension, VectorIndex, load_artifacts};

/// Owns the per-content-type vector indexes.
///
/// Readers never block each other: `get` takes a read lock only long
/// enough to clone the `Arc` snapshot, and `reload` replaces the `Arc`
/// under a short write lock after the new index is fully built.
pub struct IndexRegistry {
    artifacts_dir: PathBuf,
    dimension: VectorDimension,
    indexes: HashMap<ContentType, RwLock<Option<Arc<VectorIndex>>>>,
}

impl IndexRegistry {
    /// Loads all content-type indexes from the artifacts directory.
    ///
    /// A content type whose artifact subdirectory is missing is left
    /// unbuilt and reported per-request by [`IndexRegistry::get`]; if no
    /// index at all can be built, startup fails with a configuration
    /// error instead of serving a search surface that can never answer.
    pub fn load(artifacts_dir: &Path, dimension: VectorDimension) -> SearchResult<Self> {
        let mut indexes = HashMap::new();
        for content_type in ContentType::ALL {
            indexes.insert(content_type, RwLock::new(None));
        }

        let registry = Self {
            artifacts_dir: artifacts_dir.to_path_buf(),
            dimension,
            indexes,
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Rebuilds every index from the artifacts on disk and swaps each one
    /// in atomically. Returns the total number of indexed clips.
    pub fn reload(&self) -> SearchResult<usize> {
        let mut total = 0;
        let mut built_any = false;

        for content_type in ContentType::ALL {
            let dir = self.artifacts_dir.join(content_type.as_str());
            if !dir.is_dir() {
                warn!(
                    content_type = %content_type,
                    dir = %dir.display(),
                    "artifact directory missing, index not built"
                );
                continue;
            }

            let artifacts = load_artifacts(&dir).map_err(|e| SearchError::Config {
                reason: format!("failed to load '{content_type}' artifacts: {e}"),
            })?;

            if artifacts.dimension != self.dimension {
                return Err(SearchError::Config {
                    reason: format!(
                        "'{content_type}' artifacts have dimension {}, but the embedding provider produces {}",
                        artifacts.dimension.get(),
                        self.dimension.get()
                    ),
                });
            }

            let count = artifacts.items.len();
            let index = VectorIndex::build(self.dimension, artifacts.items)
                .map_err(|e| SearchError::Config {
                    reason: format!("failed to build '{content_type}' index: {e}"),
                })?;

            info!(content_type = %content_type, clips = count, "index built");

            // Swap in the fully built index; in-flight searches keep
            // their old snapshot until they finish.
            if let Some(slot) = self.indexes.get(&content_type) {
                *slot.write() = Some(Arc::new(index));
            }

            total += count;
            built_any = true;
        }

        if !built_any {
            return Err(SearchError::Config {
                reason: format!(
                    "no index artifacts found under {}",
                    self.artifacts_dir.display()
                ),
            });
        }

        Ok(total)
    }

    /// Returns a snapshot of the index for a content type.
    ///
    /// Fails with a configuration-class error if that type's artifacts
    /// were missing at startup. This is surfaced to the caller as a
    /// 5xx condition, never silently substituted with another index.
    pub fn get(&self, content_type: ContentType) -> SearchResult<Arc<VectorIndex>> {
        let slot = self
            .indexes
            .get(&content_type)
            .ok_or(SearchError::MissingIndex { content_type })?;
        slot.read()
            .clone()
            .ok_or(SearchError::MissingIndex { content_type })
    }

    /// Content types that currently have a built index.
    pub fn content_types(&self) -> Vec<ContentType> {
        ContentType::ALL
            .into_iter()
            .filter(|ct| {
                self.indexes
                    .get(ct)
                    .is_some_and(|slot| slot.read().is_some())
            })
            .collect()
    }

    /// Total clips across all built indexes.
    pub fn total_clips(&self) -> usize {
        self.content_types()
            .into_iter()
            .filter_map(|ct| self.get(ct).ok())
            .map(|index| index.len())
            .sum()
    }

    /// True when at least one index is built and ready to serve.
    pub fn is_ready(&self) -> bool {
        !self.content_types().is_empty()
    }
}
