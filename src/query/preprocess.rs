//! Query normalization: language handling with graceful fallback.
//!
//! The embedding model is calibrated on English descriptions, so
//! non-English queries are translated before embedding. Translation is
//! never a hard dependency: detection that fails or times out is treated
//! as inconclusive, and a failed translation degrades to the original
//! text plus a user-visible warning. `process` is therefore infallible.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::query::translation::{Detection, TranslationError, TranslationProvider};

/// Maximum length a resolved query may have after translation; longer
/// translations are truncated to keep embedding input bounded.
const MAX_RESOLVED_LEN: usize = 500;

/// Warning shown when translation degrades to the original text.
pub const TRANSLATION_WARNING: &str =
    "Translation unavailable. Searching with original text may yield less accurate results.";

/// Warning variant for provider rate limiting.
pub const RATE_LIMIT_WARNING: &str =
    "Translation unavailable (rate limit exceeded). Searching with original text may yield less accurate results.";

/// Outcome of query preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedQuery {
    /// Text to embed: the translation when it succeeded, otherwise the
    /// original query.
    pub resolved_text: String,
    /// The query exactly as the user typed it.
    pub original_text: String,
    /// Detected language code, "en" when inconclusive, "und" for
    /// non-textual input.
    pub lang_code: String,
    pub was_translated: bool,
    /// Non-blocking warning set when translation degraded.
    pub warning: Option<String>,
}

impl ProcessedQuery {
    fn passthrough(text: &str, lang_code: &str) -> Self {
        Self {
            resolved_text: text.to_string(),
            original_text: text.to_string(),
            lang_code: lang_code.to_string(),
            was_translated: false,
            warning: None,
        }
    }
}

type DetectionCache = Mutex<LruCache<String, (Detection, Instant)>>;
type TranslationCache = Mutex<LruCache<(String, String), (String, Instant)>>;

/// Normalizes raw user text into the embedding model's language.
pub struct QueryPreprocessor {
    provider: Arc<dyn TranslationProvider>,
    /// Languages eligible for translation; `None` means any.
    allowed_langs: Option<HashSet<String>>,
    timeout: Duration,
    cache_ttl: Duration,
    detection_cache: DetectionCache,
    translation_cache: TranslationCache,
}

impl QueryPreprocessor {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        allowed_langs: Option<Vec<String>>,
        timeout: Duration,
        cache_size: usize,
        cache_ttl: Duration,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            allowed_langs: allowed_langs.map(|langs| {
                langs
                    .into_iter()
                    .map(|l| l.trim().to_lowercase())
                    .filter(|l| !l.is_empty())
                    .collect()
            }),
            timeout,
            cache_ttl,
            detection_cache: Mutex::new(LruCache::new(capacity)),
            translation_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Normalizes `raw_text`. Always completes; translation failure only
    /// degrades the result.
    pub async fn process(&self, raw_text: &str) -> ProcessedQuery {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            return ProcessedQuery::passthrough(raw_text, "en");
        }

        // Digits and punctuation only: nothing to detect or translate.
        if !trimmed.chars().any(char::is_alphabetic) {
            return ProcessedQuery::passthrough(raw_text, "und");
        }

        // Non-ASCII letters mean the query is very likely not English
        // even when short strings fool the detector.
        let force_translation = contains_non_ascii_letters(trimmed);

        let detection = self.detect_cached(trimmed).await;
        let lang_code = detection.lang_code.clone();

        if detection.is_english() && !force_translation {
            return ProcessedQuery::passthrough(raw_text, &lang_code);
        }

        if let Some(allowed) = &self.allowed_langs {
            if !detection.is_english() && !allowed.contains(&lang_code) {
                debug!(lang = %lang_code, "language not in allowed set, passing through");
                return ProcessedQuery::passthrough(raw_text, &lang_code);
            }
        }

        // Detector said English but the text has non-ASCII letters; let
        // the provider pick the source language itself.
        let source_lang = if force_translation && detection.is_english() {
            "auto".to_string()
        } else {
            lang_code.clone()
        };

        match self.translate_cached(trimmed, &source_lang).await {
            Ok(mut translated) => {
                if translated.chars().count() > MAX_RESOLVED_LEN {
                    translated = translated.chars().take(MAX_RESOLVED_LEN).collect();
                }
                ProcessedQuery {
                    resolved_text: translated,
                    original_text: raw_text.to_string(),
                    lang_code,
                    was_translated: true,
                    warning: None,
                }
            }
            Err(err) => {
                warn!(lang = %lang_code, error = %err, "translation degraded to original text");
                let warning = match err {
                    TranslationError::RateLimited => RATE_LIMIT_WARNING,
                    _ => TRANSLATION_WARNING,
                };
                ProcessedQuery {
                    resolved_text: raw_text.to_string(),
                    original_text: raw_text.to_string(),
                    lang_code,
                    was_translated: false,
                    warning: Some(warning.to_string()),
                }
            }
        }
    }

    async fn detect_cached(&self, text: &str) -> Detection {
        if let Some(hit) = self.cache_get_detection(text) {
            return hit;
        }

        // Only successful detections are cached; a transient provider
        // outage must not pin inconclusive verdicts for the full TTL.
        let detection = match tokio::time::timeout(self.timeout, self.provider.detect(text)).await
        {
            Ok(Ok(detection)) => {
                self.detection_cache
                    .lock()
                    .put(text.to_string(), (detection.clone(), Instant::now()));
                detection
            }
            Ok(Err(err)) => {
                warn!(error = %err, "language detection failed, treating as inconclusive");
                return Detection::inconclusive();
            }
            Err(_) => {
                warn!("language detection timed out, treating as inconclusive");
                return Detection::inconclusive();
            }
        };

        if detection.confidence > 0.0 && detection.confidence < 0.7 {
            warn!(
                lang = %detection.lang_code,
                confidence = detection.confidence,
                "low-confidence language detection"
            );
        }

        detection
    }

    async fn translate_cached(
        &self,
        text: &str,
        source_lang: &str,
    ) -> Result<String, TranslationError> {
        let key = (source_lang.to_string(), text.to_string());
        if let Some(hit) = self.cache_get_translation(&key) {
            return Ok(hit);
        }

        let translated = match tokio::time::timeout(
            self.timeout,
            self.provider.translate(text, source_lang, "en"),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(TranslationError::BadPayload(
                    "translation request timed out".to_string(),
                ));
            }
        };

        self.translation_cache
            .lock()
            .put(key, (translated.clone(), Instant::now()));
        Ok(translated)
    }

    fn cache_get_detection(&self, text: &str) -> Option<Detection> {
        let mut cache = self.detection_cache.lock();
        match cache.get(text) {
            Some((detection, at)) if at.elapsed() < self.cache_ttl => Some(detection.clone()),
            Some(_) => {
                cache.pop(text);
                None
            }
            None => None,
        }
    }

    fn cache_get_translation(&self, key: &(String, String)) -> Option<String> {
        let mut cache = self.translation_cache.lock();
        match cache.get(key) {
            Some((translated, at)) if at.elapsed() < self.cache_ttl => Some(translated.clone()),
            Some(_) => {
                cache.pop(key);
                None
            }
            None => None,
        }
    }
}

/// True when the text contains at least one alphabetic character outside
/// the ASCII range.
fn contains_non_ascii_letters(text: &str) -> bool {
    text.chars().any(|c| c.is_alphabetic() && !c.is_ascii())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::translation::{DisabledTranslator, ProviderFuture};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubTranslator {
        detect_lang: &'static str,
        detect_fails: bool,
        translate_result: Result<&'static str, ()>,
        rate_limited: bool,
        detect_calls: AtomicUsize,
        calls: AtomicUsize,
    }

    impl StubTranslator {
        fn translating(lang: &'static str, out: &'static str) -> Self {
            Self {
                detect_lang: lang,
                detect_fails: false,
                translate_result: Ok(out),
                rate_limited: false,
                detect_calls: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(lang: &'static str) -> Self {
            Self {
                detect_lang: lang,
                translate_result: Err(()),
                ..Self::translating(lang, "unused")
            }
        }

        fn detection_down() -> Self {
            Self {
                detect_fails: true,
                ..Self::translating("vi", "rain")
            }
        }
    }

    impl TranslationProvider for StubTranslator {
        fn detect<'a>(
            &'a self,
            _text: &'a str,
        ) -> ProviderFuture<'a, Result<Detection, TranslationError>> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                if self.detect_fails {
                    return Err(TranslationError::Unavailable);
                }
                Ok(Detection {
                    lang_code: self.detect_lang.to_string(),
                    confidence: 0.95,
                })
            })
        }

        fn translate<'a>(
            &'a self,
            _text: &'a str,
            _source_lang: &'a str,
            _target_lang: &'a str,
        ) -> ProviderFuture<'a, Result<String, TranslationError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                if self.rate_limited {
                    return Err(TranslationError::RateLimited);
                }
                match self.translate_result {
                    Ok(out) => Ok(out.to_string()),
                    Err(()) => Err(TranslationError::BadPayload("boom".to_string())),
                }
            })
        }
    }

    fn preprocessor(provider: Arc<dyn TranslationProvider>) -> QueryPreprocessor {
        QueryPreprocessor::new(
            provider,
            None,
            Duration::from_secs(2),
            16,
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_english_text_passes_through() {
        let pre = preprocessor(Arc::new(StubTranslator::translating("en", "unused")));
        let result = pre.process("gentle rain on a roof").await;
        assert_eq!(result.resolved_text, "gentle rain on a roof");
        assert!(!result.was_translated);
        assert!(result.warning.is_none());
    }

    #[tokio::test]
    async fn test_non_english_is_translated() {
        let pre = preprocessor(Arc::new(StubTranslator::translating("vi", "rain sound")));
        let result = pre.process("tiếng mưa").await;
        assert_eq!(result.resolved_text, "rain sound");
        assert_eq!(result.original_text, "tiếng mưa");
        assert!(result.was_translated);
        assert!(result.warning.is_none());
        assert_eq!(result.lang_code, "vi");
    }

    #[tokio::test]
    async fn test_failed_translation_degrades_with_warning() {
        let pre = preprocessor(Arc::new(StubTranslator::failing("vi")));
        let result = pre.process("tiếng mưa").await;
        assert_eq!(result.resolved_text, "tiếng mưa");
        assert!(!result.was_translated);
        let warning = result.warning.expect("warning must be set");
        assert!(warning.contains("Translation unavailable"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_named_in_warning() {
        let provider = StubTranslator {
            rate_limited: true,
            ..StubTranslator::translating("vi", "unused")
        };
        let pre = preprocessor(Arc::new(provider));
        let result = pre.process("tiếng mưa").await;
        let warning = result.warning.expect("warning must be set");
        assert!(warning.to_lowercase().contains("rate limit"));
    }

    #[tokio::test]
    async fn test_disabled_provider_passes_ascii_through_silently() {
        // Detection is inconclusive, so ASCII text never reaches the
        // translate call and no warning appears.
        let pre = preprocessor(Arc::new(DisabledTranslator));
        let result = pre.process("soft piano").await;
        assert!(!result.was_translated);
        assert!(result.warning.is_none());
    }

    #[tokio::test]
    async fn test_non_ascii_forces_translation_attempt() {
        // Detector claims English, but the text has non-ASCII letters:
        // the preprocessor must still try to translate with auto source.
        let pre = preprocessor(Arc::new(StubTranslator::translating("en", "storm")));
        let result = pre.process("bão").await;
        assert!(result.was_translated);
        assert_eq!(result.resolved_text, "storm");
    }

    #[tokio::test]
    async fn test_allowed_langs_filters_translation() {
        let pre = QueryPreprocessor::new(
            Arc::new(StubTranslator::translating("fr", "unused")),
            Some(vec!["vi".to_string()]),
            Duration::from_secs(2),
            16,
            Duration::from_secs(3600),
        );
        let result = pre.process("où est la pluie").await;
        assert!(!result.was_translated);
        assert!(result.warning.is_none());
        assert_eq!(result.lang_code, "fr");
    }

    #[tokio::test]
    async fn test_non_textual_input_is_untouched() {
        let pre = preprocessor(Arc::new(StubTranslator::translating("vi", "unused")));
        let result = pre.process("12345 !!!").await;
        assert_eq!(result.lang_code, "und");
        assert!(!result.was_translated);
    }

    #[tokio::test]
    async fn test_translation_results_are_cached() {
        let provider = Arc::new(StubTranslator::translating("vi", "rain"));
        let pre = preprocessor(provider.clone());
        pre.process("tiếng mưa").await;
        pre.process("tiếng mưa").await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detections_are_cached() {
        let provider = Arc::new(StubTranslator::translating("vi", "rain"));
        let pre = preprocessor(provider.clone());
        pre.process("tiếng mưa").await;
        pre.process("tiếng mưa").await;
        assert_eq!(provider.detect_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_detections_are_retried_not_cached() {
        // A provider outage must not pin an inconclusive verdict in the
        // cache: the next request for the same text detects again.
        let provider = Arc::new(StubTranslator::detection_down());
        let pre = preprocessor(provider.clone());
        pre.process("tiếng mưa").await;
        pre.process("tiếng mưa").await;
        assert_eq!(provider.detect_calls.load(Ordering::SeqCst), 2);
    }
}
