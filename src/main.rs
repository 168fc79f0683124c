//! CLI entry point for the audio retrieval service.
//!
//! Provides commands for serving the search API and inspecting the
//! active configuration and index artifacts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use echoseek::config::{CONFIG_FILE, Settings, TranslationConfig};
use echoseek::orchestrator::{OrchestratorConfig, RetrievalOrchestrator};
use echoseek::query::{
    DeepLTranslator, DisabledTranslator, GoogleTranslator, QueryPreprocessor, TranslationProvider,
};
use echoseek::registry::IndexRegistry;
use echoseek::server::{AppState, ExamplePrompts};
use echoseek::vector::{EmbeddingProvider, FastEmbedProvider};

#[derive(Parser)]
#[command(name = "echoseek", version, about = "Semantic audio search service")]
struct Cli {
    /// Path to a custom configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP search server
    Serve {
        /// Override the bind address, e.g. 127.0.0.1:9000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Validate configuration and index artifacts, then exit
    Check,
    /// Print the active configuration as TOML
    Config,
}

fn build_translator(cfg: &TranslationConfig) -> anyhow::Result<Arc<dyn TranslationProvider>> {
    let timeout = Duration::from_millis(cfg.timeout_ms);
    match cfg.provider.as_str() {
        "google" => {
            if cfg.api_key.is_empty() {
                bail!("translation.provider is 'google' but translation.api_key is empty");
            }
            let translator =
                GoogleTranslator::new(cfg.api_key.clone(), cfg.api_url.as_deref(), timeout)?;
            Ok(Arc::new(translator))
        }
        "deepl" => {
            if cfg.api_key.is_empty() {
                bail!("translation.provider is 'deepl' but translation.api_key is empty");
            }
            let translator =
                DeepLTranslator::new(cfg.api_key.clone(), cfg.api_url.as_deref(), timeout)?;
            Ok(Arc::new(translator))
        }
        "disabled" | "" => Ok(Arc::new(DisabledTranslator)),
        other => bail!("unknown translation.provider '{other}', expected google, deepl or disabled"),
    }
}

fn build_state(settings: &Settings) -> anyhow::Result<Arc<AppState>> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
        FastEmbedProvider::new(&settings.embedding.model, settings.embedding.cache_dir.clone())
            .context("failed to initialize embedding model")?,
    );

    let registry = Arc::new(
        IndexRegistry::load(&settings.artifacts_dir, embedder.dimension())
            .context("failed to load index artifacts")?,
    );

    let translator = build_translator(&settings.translation)?;
    let preprocessor = Arc::new(QueryPreprocessor::new(
        Arc::clone(&translator),
        if settings.translation.allowed_langs.is_empty() {
            None
        } else {
            Some(settings.translation.allowed_langs.clone())
        },
        Duration::from_millis(settings.translation.timeout_ms),
        settings.translation.cache_size,
        Duration::from_secs(settings.translation.cache_ttl_secs),
    ));

    let orchestrator = RetrievalOrchestrator::new(
        Arc::clone(&registry),
        embedder,
        preprocessor,
        OrchestratorConfig {
            audio_dir: settings.audio_dir.clone(),
            default_top_k: settings.search.default_top_k,
            max_top_k: settings.search.max_top_k,
            embed_timeout: Duration::from_millis(settings.search.embed_timeout_ms),
        },
    );

    let prompts = ExamplePrompts::load_or_builtin(settings.prompts_path.as_deref());

    Ok(Arc::new(AppState {
        orchestrator,
        registry,
        translator,
        prompts,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load_from(&cli.config)
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                let (host, port) = bind
                    .rsplit_once(':')
                    .context("--bind must look like host:port")?;
                settings.server.host = host.to_string();
                settings.server.port = port.parse().context("--bind port is not a number")?;
            }
            let state = build_state(&settings)?;
            echoseek::server::serve(state, &settings).await
        }
        Commands::Check => {
            let state = build_state(&settings)?;
            println!(
                "ok: {} clips indexed across {:?}",
                state.registry.total_clips(),
                state
                    .registry
                    .content_types()
                    .iter()
                    .map(|ct| ct.as_str())
                    .collect::<Vec<_>>()
            );
            Ok(())
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
