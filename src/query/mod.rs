//! Query-side processing: language normalization and expansion.
//!
//! Everything here runs before embedding. The preprocessor resolves the
//! query to English (best effort), and the expander enriches the
//! resolved text for better retrieval quality.

mod expansion;
mod preprocess;
pub mod translation;

pub use expansion::{ExpandedQuery, QueryExpander, average_embeddings};
pub use preprocess::{
    ProcessedQuery, QueryPreprocessor, RATE_LIMIT_WARNING, TRANSLATION_WARNING,
};
pub use translation::{
    DeepLTranslator, Detection, DisabledTranslator, GoogleTranslator, TranslationError,
    TranslationProvider,
};
