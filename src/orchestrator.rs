//! End-to-end search pipeline.
//!
//! The orchestrator wires the stages together: validate the request,
//! normalize the query language, expand it, embed it once, then search
//! either the explicitly requested index or all of them with score-based
//! content-type resolution. It owns no index data itself; all corpus
//! state lives in the [`IndexRegistry`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{SearchError, SearchResult};
use crate::query::{QueryExpander, QueryPreprocessor, average_embeddings};
use crate::registry::IndexRegistry;
use crate::resolver::resolve_content_type;
use crate::types::{ContentType, MatchTier};
use crate::vector::{EmbeddingProvider, SearchHit, Similarity, VectorIndex};

/// Longest accepted query, in characters.
pub const MAX_QUERY_LEN: usize = 500;

/// Tunable limits for the pipeline, typically taken from configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory the audio corpus is served from; clip paths are made
    /// relative to it when building playback URLs.
    pub audio_dir: PathBuf,
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub embed_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audio"),
            default_top_k: 5,
            max_top_k: 50,
            embed_timeout: Duration::from_secs(10),
        }
    }
}

/// One search request after HTTP decoding.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// `None` requests score-based auto-detection.
    pub content_type: Option<ContentType>,
    /// `None` falls back to the configured default.
    pub top_k: Option<usize>,
}

/// One ranked clip in a search response.
#[derive(Debug, Clone)]
pub struct RankedClip {
    pub filename: String,
    /// Normalized similarity in [0, 1].
    pub similarity: f32,
    /// Raw cosine similarity in [-1, 1].
    pub raw_score: f32,
    pub tier: MatchTier,
    /// Playback path under the audio mount, e.g. `/audio/sfx/rain.wav`.
    pub audio_url: String,
    /// Directory of the clip relative to the corpus root, "" at the root.
    pub folder: String,
}

/// Complete outcome of one search, ready for response encoding.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<RankedClip>,
    /// The content type actually searched (requested or detected).
    pub content_type: ContentType,
    /// Whether the type came from the request or from score resolution.
    pub detected: bool,
    pub original_query: String,
    /// Query text after translation. Expansion stays internal to the
    /// embedding step and is never echoed back.
    pub resolved_query: String,
    pub was_translated: bool,
    pub translation_warning: Option<String>,
}

/// Drives a search request through preprocessing, embedding and ranking.
pub struct RetrievalOrchestrator {
    registry: Arc<IndexRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
    preprocessor: Arc<QueryPreprocessor>,
    expander: QueryExpander,
    config: OrchestratorConfig,
}

impl RetrievalOrchestrator {
    pub fn new(
        registry: Arc<IndexRegistry>,
        embedder: Arc<dyn EmbeddingProvider>,
        preprocessor: Arc<QueryPreprocessor>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            embedder,
            preprocessor,
            expander: QueryExpander::new(),
            config,
        }
    }

    /// Runs the full pipeline for one request.
    pub async fn search(&self, request: &SearchRequest) -> SearchResult<SearchOutcome> {
        let top_k = self.validate(request)?;

        let processed = self.preprocessor.process(&request.query).await;
        let expanded = self
            .expander
            .expand(&processed.resolved_text, request.content_type);
        if !expanded.applied.is_empty() {
            debug!(applied = ?expanded.applied, "query expansion applied");
        }

        let query_vector = self.embed_variants(&expanded.variants).await?;

        // Hit positions are only meaningful against the snapshot that
        // produced them, so the searched index is carried through to
        // ranking instead of re-fetched; a concurrent reload must not
        // change the corpus under an in-flight request.
        let (content_type, detected, index, hits) = match request.content_type {
            Some(content_type) => {
                let index = self.registry.get(content_type)?;
                let hits = index.search(&query_vector, top_k)?;
                (content_type, false, index, hits)
            }
            None => self.search_all(&query_vector, top_k)?,
        };

        let results = self.rank(&index, &hits);

        info!(
            content_type = %content_type,
            detected,
            results = results.len(),
            translated = processed.was_translated,
            "search completed"
        );

        Ok(SearchOutcome {
            results,
            content_type,
            detected,
            original_query: processed.original_text,
            resolved_query: processed.resolved_text,
            was_translated: processed.was_translated,
            translation_warning: processed.warning,
        })
    }

    fn validate(&self, request: &SearchRequest) -> SearchResult<usize> {
        if request.query.trim().is_empty() {
            return Err(SearchError::validation("query must not be empty"));
        }
        if request.query.chars().count() > MAX_QUERY_LEN {
            return Err(SearchError::validation(format!(
                "query exceeds the maximum length of {MAX_QUERY_LEN} characters"
            )));
        }

        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        if top_k == 0 {
            return Err(SearchError::validation("top_k must be at least 1"));
        }
        if top_k > self.config.max_top_k {
            return Err(SearchError::validation(format!(
                "top_k must not exceed {}",
                self.config.max_top_k
            )));
        }
        Ok(top_k)
    }

    /// Embeds all prompt variants in one blocking batch, bounded by the
    /// configured timeout, and averages them into a single query vector.
    /// Unlike translation, an embedding failure is fatal for the request.
    async fn embed_variants(&self, variants: &[String]) -> SearchResult<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let texts = variants.to_vec();
        let task = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            embedder.embed(&refs)
        });

        let embeddings = match tokio::time::timeout(self.config.embed_timeout, task).await {
            Ok(Ok(result)) => result.map_err(SearchError::from)?,
            Ok(Err(join_err)) => {
                return Err(SearchError::embedding(format!(
                    "embedding task failed: {join_err}"
                )));
            }
            Err(_) => {
                return Err(SearchError::embedding(format!(
                    "embedding timed out after {:?}",
                    self.config.embed_timeout
                )));
            }
        };

        average_embeddings(&embeddings)
            .ok_or_else(|| SearchError::embedding("provider returned no embeddings"))
    }

    /// Searches every built index with the shared query vector and keeps
    /// the winning index's snapshot together with its hits, so ranking
    /// later resolves positions against the corpus that was searched.
    fn search_all(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> SearchResult<(ContentType, bool, Arc<VectorIndex>, Vec<SearchHit>)> {
        let mut per_type: Vec<(ContentType, Arc<VectorIndex>, Vec<SearchHit>)> = Vec::new();
        for content_type in self.registry.content_types() {
            let index = self.registry.get(content_type)?;
            let hits = index.search(query_vector, top_k)?;
            per_type.push((content_type, index, hits));
        }

        let candidates: Vec<(ContentType, f32)> = per_type
            .iter()
            .filter_map(|(ct, _, hits)| hits.first().map(|hit| (*ct, hit.raw_score)))
            .collect();

        let winner = match resolve_content_type(&candidates) {
            Some(resolution) => resolution.content_type,
            // All built indexes are empty; fall back to priority order.
            None => per_type
                .first()
                .map(|(ct, _, _)| *ct)
                .unwrap_or(ContentType::Song),
        };

        per_type
            .into_iter()
            .find(|(ct, _, _)| *ct == winner)
            .map(|(ct, index, hits)| (ct, true, index, hits))
            .ok_or(SearchError::MissingIndex {
                content_type: winner,
            })
    }

    fn rank(&self, index: &VectorIndex, hits: &[SearchHit]) -> Vec<RankedClip> {
        hits.iter()
            .filter_map(|hit| {
                let meta = index.item(hit.position)?;
                let similarity = Similarity::from_raw(hit.raw_score).get();
                let relative = self.relative_path(&meta.source_path, &meta.filename);
                let folder = Path::new(&relative)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Some(RankedClip {
                    filename: meta.filename.clone(),
                    similarity,
                    raw_score: hit.raw_score,
                    tier: MatchTier::from_similarity(similarity),
                    audio_url: format!("/audio/{relative}"),
                    folder,
                })
            })
            .collect()
    }

    /// Path of a clip relative to the audio corpus root, falling back to
    /// the bare filename when the stored path lies outside it.
    fn relative_path(&self, source_path: &str, filename: &str) -> String {
        let path = Path::new(source_path);
        if let Ok(relative) = path.strip_prefix(&self.config.audio_dir) {
            return relative.to_string_lossy().into_owned();
        }
        if path.is_relative() && !source_path.is_empty() {
            return source_path.to_string();
        }
        filename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::DisabledTranslator;
    use crate::vector::{CorpusItem, MockEmbeddingProvider, VectorDimension, write_artifacts};
    use tempfile::TempDir;

    const DIM: usize = 16;

    fn embed(provider: &MockEmbeddingProvider, text: &str) -> Vec<f32> {
        provider.embed(&[text]).unwrap().remove(0)
    }

    fn corpus_item(provider: &MockEmbeddingProvider, name: &str, text: &str) -> CorpusItem {
        CorpusItem {
            filename: name.to_string(),
            source_path: format!("clips/{name}"),
            embedding: embed(provider, text),
        }
    }

    fn orchestrator(temp: &TempDir) -> RetrievalOrchestrator {
        let provider = MockEmbeddingProvider::with_dimension(VectorDimension::new(DIM).unwrap());
        let dim = VectorDimension::new(DIM).unwrap();

        write_artifacts(
            &temp.path().join("sfx"),
            dim,
            &[
                corpus_item(&provider, "rain.wav", "heavy rain and thunder storm"),
                corpus_item(&provider, "wind.wav", "howling wind"),
            ],
        )
        .unwrap();
        write_artifacts(
            &temp.path().join("song"),
            dim,
            &[
                corpus_item(&provider, "piano.mp3", "soft piano music song"),
                corpus_item(&provider, "upbeat.mp3", "upbeat music song"),
            ],
        )
        .unwrap();

        let registry = Arc::new(IndexRegistry::load(temp.path(), dim).unwrap());
        let preprocessor = Arc::new(QueryPreprocessor::new(
            Arc::new(DisabledTranslator),
            None,
            Duration::from_secs(2),
            16,
            Duration::from_secs(3600),
        ));
        RetrievalOrchestrator::new(
            registry,
            Arc::new(provider),
            preprocessor,
            OrchestratorConfig {
                audio_dir: PathBuf::from("clips"),
                ..OrchestratorConfig::default()
            },
        )
    }

    fn request(query: &str, content_type: Option<ContentType>) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            content_type,
            top_k: None,
        }
    }

    #[tokio::test]
    async fn test_explicit_content_type_is_honored() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let outcome = orch
            .search(&request("rain", Some(ContentType::Song)))
            .await
            .unwrap();
        assert_eq!(outcome.content_type, ContentType::Song);
        assert!(!outcome.detected);
        // Song index holds no rain clips, but the requested index is
        // never silently swapped for a better-scoring one.
        assert!(outcome.results.iter().all(|r| r.filename.ends_with(".mp3")));
    }

    #[tokio::test]
    async fn test_auto_detection_picks_sfx_for_sound_query() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let outcome = orch.search(&request("heavy rain", None)).await.unwrap();
        assert_eq!(outcome.content_type, ContentType::Sfx);
        assert!(outcome.detected);
        assert_eq!(outcome.results[0].filename, "rain.wav");
    }

    #[tokio::test]
    async fn test_auto_detection_picks_song_for_music_query() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let outcome = orch.search(&request("piano music", None)).await.unwrap();
        assert_eq!(outcome.content_type, ContentType::Song);
        assert_eq!(outcome.results[0].filename, "piano.mp3");
    }

    #[tokio::test]
    async fn test_results_carry_urls_and_tiers() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let outcome = orch.search(&request("heavy rain", None)).await.unwrap();
        let top = &outcome.results[0];
        assert_eq!(top.audio_url, "/audio/rain.wav");
        assert_eq!(top.folder, "");
        assert!(top.similarity >= 0.0 && top.similarity <= 1.0);
        assert_eq!(top.tier, MatchTier::from_similarity(top.similarity));
        // Scores must be descending.
        for pair in outcome.results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let err = orch.search(&request("   ", None)).await.unwrap_err();
        assert!(matches!(err, SearchError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_oversized_query_is_rejected() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let long = "a".repeat(MAX_QUERY_LEN + 1);
        let err = orch.search(&request(&long, None)).await.unwrap_err();
        assert!(matches!(err, SearchError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_top_k_bounds_are_enforced() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let mut req = request("rain", None);
        req.top_k = Some(0);
        assert!(matches!(
            orch.search(&req).await,
            Err(SearchError::Validation { .. })
        ));

        req.top_k = Some(1000);
        assert!(matches!(
            orch.search(&req).await,
            Err(SearchError::Validation { .. })
        ));

        req.top_k = Some(1);
        let outcome = orch.search(&req).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_queries_are_deterministic() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        let a = orch.search(&request("rain", None)).await.unwrap();
        let b = orch.search(&request("rain", None)).await.unwrap();
        let names_a: Vec<&str> = a.results.iter().map(|r| r.filename.as_str()).collect();
        let names_b: Vec<&str> = b.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names_a, names_b);
        assert_eq!(a.content_type, b.content_type);
    }

    #[tokio::test]
    async fn test_ranking_resolves_positions_against_the_searched_snapshot() {
        let temp = TempDir::new().unwrap();
        let dim = VectorDimension::new(DIM).unwrap();
        let provider = MockEmbeddingProvider::with_dimension(dim);

        write_artifacts(
            &temp.path().join("sfx"),
            dim,
            &[
                corpus_item(&provider, "rain.wav", "heavy rain and thunder storm"),
                corpus_item(&provider, "wind.wav", "howling wind"),
            ],
        )
        .unwrap();

        let registry = Arc::new(IndexRegistry::load(temp.path(), dim).unwrap());
        let preprocessor = Arc::new(QueryPreprocessor::new(
            Arc::new(DisabledTranslator),
            None,
            Duration::from_secs(2),
            16,
            Duration::from_secs(3600),
        ));
        let orch = RetrievalOrchestrator::new(
            Arc::clone(&registry),
            Arc::new(MockEmbeddingProvider::with_dimension(dim)),
            preprocessor,
            OrchestratorConfig {
                audio_dir: PathBuf::from("clips"),
                ..OrchestratorConfig::default()
            },
        );

        let query_vector = provider.embed(&["heavy rain"]).unwrap().remove(0);
        let (content_type, _, index, hits) = orch.search_all(&query_vector, 5).unwrap();
        assert_eq!(content_type, ContentType::Sfx);
        assert_eq!(index.item(hits[0].position).unwrap().filename, "rain.wav");

        // A reindex swaps in a reordered (and here also smaller) corpus
        // between scoring and ranking; positions from the old snapshot
        // must still resolve against that snapshot.
        write_artifacts(
            &temp.path().join("sfx"),
            dim,
            &[corpus_item(&provider, "wind.wav", "howling wind")],
        )
        .unwrap();
        registry.reload().unwrap();

        let results = orch.rank(&index, &hits);
        assert_eq!(results.len(), hits.len());
        assert_eq!(results[0].filename, "rain.wav");
    }

    #[tokio::test]
    async fn test_echoed_query_excludes_expansion_terms() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        // "storm" triggers synonym expansion for embedding, but the
        // echoed query stays the translated user text.
        let outcome = orch
            .search(&request("storm at sea", Some(ContentType::Sfx)))
            .await
            .unwrap();
        assert_eq!(outcome.resolved_query, "storm at sea");
        assert_eq!(outcome.original_query, "storm at sea");
    }

    #[test]
    fn test_relative_path_fallbacks() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp);

        assert_eq!(orch.relative_path("clips/sub/a.wav", "a.wav"), "sub/a.wav");
        assert_eq!(orch.relative_path("other/b.wav", "b.wav"), "other/b.wav");
        assert_eq!(orch.relative_path("/abs/elsewhere/c.wav", "c.wav"), "c.wav");
        assert_eq!(orch.relative_path("", "d.wav"), "d.wav");
    }
}
