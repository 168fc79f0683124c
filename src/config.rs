//! Configuration for the audio retrieval service.
//!
//! Layered configuration with three sources, later ones winning:
//! - built-in defaults
//! - `echoseek.toml` in the working directory (or an explicit path)
//! - environment variables
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `ES_` and use double
//! underscores to separate nested levels:
//! - `ES_SERVER__PORT=9000` sets `server.port`
//! - `ES_SEARCH__MAX_TOP_K=100` sets `search.max_top_k`
//! - `ES_TRANSLATION__API_KEY=...` sets `translation.api_key`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "echoseek.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Directory holding the audio corpus, served under `/audio`.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    /// Directory holding per-content-type embedding artifacts
    /// (`song/`, `sfx/` subdirectories with vectors.bin + metadata.json).
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Search pipeline settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Translation provider settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Optional JSON file with example prompts for the UI; built-in
    /// prompts are used when unset or unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS; `*` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Results returned when the request does not specify top_k.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Hard ceiling on requested top_k.
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Budget for one embedding batch, in milliseconds. Exceeding it
    /// fails the request.
    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Model name; see the supported list in the vector module.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Directory model weights are cached under.
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TranslationConfig {
    /// "google", "deepl" or "disabled".
    #[serde(default = "default_translation_provider")]
    pub provider: String,

    #[serde(default)]
    pub api_key: String,

    /// Override for the provider base URL, mainly for tests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Language codes eligible for translation; empty means any.
    #[serde(default)]
    pub allowed_langs: Vec<String>,

    /// Budget for one detection or translation call, in milliseconds.
    #[serde(default = "default_translation_timeout_ms")]
    pub timeout_ms: u64,

    /// Entries kept in each of the detection and translation caches.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

// Default value functions
fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}
fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_top_k() -> usize {
    5
}
fn default_max_top_k() -> usize {
    50
}
fn default_embed_timeout_ms() -> u64 {
    10_000
}
fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_model_cache_dir() -> PathBuf {
    PathBuf::from(".fastembed_cache")
}
fn default_translation_provider() -> String {
    "disabled".to_string()
}
fn default_translation_timeout_ms() -> u64 {
    2_000
}
fn default_cache_size() -> usize {
    256
}
fn default_cache_ttl_secs() -> u64 {
    3_600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            artifacts_dir: default_artifacts_dir(),
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            embedding: EmbeddingConfig::default(),
            translation: TranslationConfig::default(),
            prompts_path: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            embed_timeout_ms: default_embed_timeout_ms(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: default_model_cache_dir(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: default_translation_provider(),
            api_key: String::new(),
            api_url: None,
            allowed_langs: Vec::new(),
            timeout_ms: default_translation_timeout_ms(),
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, the default config file and the
    /// environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore separates nesting levels; a single
            // underscore stays part of the field name.
            .merge(Env::prefixed("ES_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_sensible() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.search.default_top_k, 5);
        assert!(settings.search.default_top_k <= settings.search.max_top_k);
        assert_eq!(settings.translation.provider, "disabled");
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("echoseek.toml");
        fs::write(
            &config_path,
            r#"
artifacts_dir = "/data/artifacts"

[server]
port = 9100

[search]
max_top_k = 20
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.artifacts_dir, PathBuf::from("/data/artifacts"));
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.search.max_top_k, 20);
        // Untouched sections keep their defaults.
        assert_eq!(settings.search.default_top_k, 5);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn test_partial_translation_section() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("echoseek.toml");
        fs::write(
            &config_path,
            r#"
[translation]
provider = "google"
api_key = "test-key"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.translation.provider, "google");
        assert_eq!(settings.translation.api_key, "test-key");
        assert_eq!(settings.translation.timeout_ms, 2_000);
    }

    #[test]
    fn test_save_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("saved.toml");

        let mut settings = Settings::default();
        settings.server.port = 9999;
        settings.save(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 9999);
    }
}
