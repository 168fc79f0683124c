//! Semantic audio search over precomputed clip embeddings.
//!
//! The crate serves natural-language search over an audio corpus split
//! into content types (songs and sound effects). Each content type has
//! its own exact-search vector index built from offline-embedded
//! artifacts; at query time the text is language-normalized, expanded,
//! embedded once, and ranked by cosine similarity. When the request does
//! not name a content type, the winner is resolved from the indexes'
//! top scores rather than guessed from keywords.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{SearchError, SearchResult};
pub use orchestrator::{
    OrchestratorConfig, RankedClip, RetrievalOrchestrator, SearchOutcome, SearchRequest,
};
pub use query::{ProcessedQuery, QueryExpander, QueryPreprocessor, TranslationProvider};
pub use registry::IndexRegistry;
pub use resolver::{Resolution, resolve_content_type};
pub use types::{ContentType, MatchTier};
pub use vector::{EmbeddingProvider, FastEmbedProvider, VectorDimension, VectorIndex};
