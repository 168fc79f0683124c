//! Pluggable translation providers.
//!
//! Translation is a best-effort enhancement: every provider call is
//! bounded by a timeout and any failure degrades to searching with the
//! original text. Providers implement language detection where their API
//! offers it; detection failures are treated as inconclusive.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

/// Boxed future so the provider trait stays object-safe.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of provider-side language detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ISO 639-1 code, lowercase.
    pub lang_code: String,
    /// Provider confidence in [0, 1]; 0.0 when the provider reports none.
    pub confidence: f32,
}

impl Detection {
    /// Inconclusive detection, treated as "already in the target language".
    #[must_use]
    pub fn inconclusive() -> Self {
        Self {
            lang_code: "en".to_string(),
            confidence: 0.0,
        }
    }

    #[must_use]
    pub fn is_english(&self) -> bool {
        self.lang_code == "en"
    }
}

/// Errors from translation providers. None of these fail a search
/// request; they all degrade to the original text plus a warning.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("translation provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("translation provider returned unexpected payload: {0}")]
    BadPayload(String),

    #[error("translation provider not configured")]
    Unavailable,
}

/// Pluggable provider boundary for detection and translation.
pub trait TranslationProvider: Send + Sync {
    /// Detect the language of `text`.
    fn detect<'a>(&'a self, text: &'a str) -> ProviderFuture<'a, Result<Detection, TranslationError>>;

    /// Translate `text` from `source_lang` (or "auto") into `target_lang`.
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> ProviderFuture<'a, Result<String, TranslationError>>;
}

/// Google Cloud Translation v2 provider.
pub struct GoogleTranslator {
    http: reqwest::Client,
    api_key: String,
    translate_url: String,
    detect_url: String,
}

impl GoogleTranslator {
    pub const DEFAULT_TRANSLATE_URL: &'static str =
        "https://translation.googleapis.com/language/translate/v2";

    /// Builds a provider against the default or an overridden base URL.
    pub fn new(
        api_key: String,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, TranslationError> {
        let translate_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| Self::DEFAULT_TRANSLATE_URL.to_string());
        let detect_url = format!("{translate_url}/detect");
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            translate_url,
            detect_url,
        })
    }

    async fn detect_inner(&self, text: &str) -> Result<Detection, TranslationError> {
        let url = format!("{}?key={}", self.detect_url, self.api_key);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "q": text }))
            .send()
            .await?;

        if response.status().as_u16() == 429 {
            return Err(TranslationError::RateLimited);
        }
        let body: serde_json::Value = response.error_for_status()?.json().await?;

        let detection = body
            .pointer("/data/detections/0/0")
            .ok_or_else(|| TranslationError::BadPayload("missing detections".to_string()))?;
        let lang_code = detection
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or("en")
            .to_lowercase();
        let confidence = detection
            .get("confidence")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0) as f32;

        Ok(Detection {
            lang_code,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    async fn translate_inner(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}?key={}", self.translate_url, self.api_key);
        let mut payload = json!({
            "q": text,
            "target": target_lang,
            "format": "text",
        });
        if source_lang != "auto" {
            payload["source"] = json!(source_lang);
        }

        let response = self.http.post(&url).json(&payload).send().await?;
        if response.status().as_u16() == 429 {
            return Err(TranslationError::RateLimited);
        }
        let body: serde_json::Value = response.error_for_status()?.json().await?;

        body.pointer("/data/translations/0/translatedText")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TranslationError::BadPayload("missing translatedText".to_string()))
    }
}

impl TranslationProvider for GoogleTranslator {
    fn detect<'a>(&'a self, text: &'a str) -> ProviderFuture<'a, Result<Detection, TranslationError>> {
        Box::pin(self.detect_inner(text))
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> ProviderFuture<'a, Result<String, TranslationError>> {
        Box::pin(self.translate_inner(text, source_lang, target_lang))
    }
}

/// DeepL API provider. DeepL has no standalone detection endpoint, so
/// `detect` reports inconclusive and the preprocessor relies on its
/// non-ASCII heuristic to decide whether to translate.
pub struct DeepLTranslator {
    http: reqwest::Client,
    api_key: String,
    translate_url: String,
}

impl DeepLTranslator {
    pub const DEFAULT_TRANSLATE_URL: &'static str = "https://api-free.deepl.com/v2/translate";

    pub fn new(
        api_key: String,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, TranslationError> {
        let translate_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| Self::DEFAULT_TRANSLATE_URL.to_string());
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            translate_url,
        })
    }

    async fn translate_inner(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let mut payload = json!({
            "text": [text],
            "target_lang": target_lang.to_uppercase(),
        });
        if source_lang != "auto" {
            payload["source_lang"] = json!(source_lang.to_uppercase());
        }

        let response = self
            .http
            .post(&self.translate_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&payload)
            .send()
            .await?;
        if response.status().as_u16() == 429 {
            return Err(TranslationError::RateLimited);
        }
        let body: serde_json::Value = response.error_for_status()?.json().await?;

        body.pointer("/translations/0/text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TranslationError::BadPayload("missing translations".to_string()))
    }
}

impl TranslationProvider for DeepLTranslator {
    fn detect<'a>(&'a self, _text: &'a str) -> ProviderFuture<'a, Result<Detection, TranslationError>> {
        Box::pin(async { Ok(Detection::inconclusive()) })
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> ProviderFuture<'a, Result<String, TranslationError>> {
        Box::pin(self.translate_inner(text, source_lang, target_lang))
    }
}

/// Provider used when translation is not configured. Detection is
/// inconclusive and translation reports unavailability; the preprocessor
/// degrades to the original text.
pub struct DisabledTranslator;

impl TranslationProvider for DisabledTranslator {
    fn detect<'a>(&'a self, _text: &'a str) -> ProviderFuture<'a, Result<Detection, TranslationError>> {
        Box::pin(async { Ok(Detection::inconclusive()) })
    }

    fn translate<'a>(
        &'a self,
        _text: &'a str,
        _source_lang: &'a str,
        _target_lang: &'a str,
    ) -> ProviderFuture<'a, Result<String, TranslationError>> {
        Box::pin(async { Err(TranslationError::Unavailable) })
    }
}
