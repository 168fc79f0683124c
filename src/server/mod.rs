//! HTTP server exposing the search pipeline.
//!
//! Endpoints:
//! - `POST /api/search` runs one search request
//! - `GET /api/health` reports readiness and corpus size
//! - `GET /api/example-prompts` serves UI starter prompts
//! - `POST /api/reindex` rebuilds all indexes from the artifacts on disk
//! - `GET /audio/*` serves the clip files referenced by search results

mod prompts;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::SearchError;
use crate::orchestrator::{RetrievalOrchestrator, SearchRequest};
use crate::query::TranslationProvider;
use crate::registry::IndexRegistry;
use crate::types::{ContentType, MatchTier};

pub use prompts::{ExamplePrompts, Prompt, SearchTip};

/// Shared state behind every handler.
pub struct AppState {
    pub orchestrator: RetrievalOrchestrator,
    pub registry: Arc<IndexRegistry>,
    pub translator: Arc<dyn TranslationProvider>,
    pub prompts: ExamplePrompts,
}

type SharedState = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    /// "song", "sfx" or absent for auto-detection.
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ClipResult {
    pub filename: String,
    pub similarity: f32,
    pub raw_score: f32,
    pub tier: MatchTier,
    pub match_quality: &'static str,
    pub content_type: ContentType,
    pub audio_url: String,
    pub folder: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ClipResult>,
    pub num_results: usize,
    pub content_type: ContentType,
    /// True when the type was resolved from index scores rather than
    /// named in the request.
    pub detected_content_type: bool,
    /// Query text after translation.
    pub query: String,
    pub original_query: String,
    pub was_translated: bool,
    /// Always present, null when translation did not degrade.
    pub translation_warning: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(kind = self.status_code(), "request failed: {self}");
        }
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.status_code(),
        };
        (status, Json(body)).into_response()
    }
}

async fn search(
    State(state): State<SharedState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, SearchError> {
    let content_type = body
        .content_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(ContentType::from_str)
        .transpose()
        .map_err(SearchError::validation)?;

    let request = SearchRequest {
        query: body.query,
        content_type,
        top_k: body.top_k,
    };
    let outcome = state.orchestrator.search(&request).await?;

    let results: Vec<ClipResult> = outcome
        .results
        .into_iter()
        .map(|clip| ClipResult {
            filename: clip.filename,
            similarity: clip.similarity,
            raw_score: clip.raw_score,
            tier: clip.tier,
            match_quality: clip.tier.label(),
            content_type: outcome.content_type,
            audio_url: clip.audio_url,
            folder: clip.folder,
        })
        .collect();

    Ok(Json(SearchResponse {
        num_results: results.len(),
        results,
        content_type: outcome.content_type,
        detected_content_type: outcome.detected,
        query: outcome.resolved_query,
        original_query: outcome.original_query,
        was_translated: outcome.was_translated,
        translation_warning: outcome.translation_warning,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub index_loaded: bool,
    pub indexed_clips: usize,
    pub content_types: Vec<ContentType>,
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let ready = state.registry.is_ready();
    Json(HealthResponse {
        status: if ready { "ok" } else { "degraded" },
        // The embedding model is constructed before the server starts.
        model_loaded: true,
        index_loaded: ready,
        indexed_clips: state.registry.total_clips(),
        content_types: state.registry.content_types(),
    })
}

#[derive(Debug, Deserialize)]
struct PromptsParams {
    /// Target language for the prompts; English when absent.
    lang: Option<String>,
}

async fn example_prompts(
    State(state): State<SharedState>,
    Query(params): Query<PromptsParams>,
) -> Json<ExamplePrompts> {
    let lang = params
        .lang
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("en"));

    let prompts = match lang {
        Some(lang) => {
            state
                .prompts
                .translated(state.translator.as_ref(), lang)
                .await
        }
        None => state.prompts.clone(),
    };
    Json(prompts)
}

#[derive(Debug, Serialize)]
struct ReindexResponse {
    content_types: Vec<ContentType>,
    total_clips: usize,
}

async fn reindex(State(state): State<SharedState>) -> Result<Json<ReindexResponse>, SearchError> {
    let registry = Arc::clone(&state.registry);
    let total = tokio::task::spawn_blocking(move || registry.reload())
        .await
        .map_err(|e| SearchError::Internal(format!("reindex task failed: {e}")))??;
    info!(total_clips = total, "reindex completed");
    Ok(Json(ReindexResponse {
        content_types: state.registry.content_types(),
        total_clips: total,
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Builds the full application router.
pub fn router(state: SharedState, settings: &Settings) -> Router {
    Router::new()
        .route("/api/search", post(search))
        .route("/api/health", get(health))
        .route("/api/example-prompts", get(example_prompts))
        .route("/api/reindex", post(reindex))
        .nest_service("/audio", ServeDir::new(&settings.audio_dir))
        .layer(cors_layer(&settings.server.cors_origins))
        .with_state(state)
}

/// Binds the listener and serves until Ctrl+C.
pub async fn serve(state: SharedState, settings: &Settings) -> anyhow::Result<()> {
    let app = router(state, settings);
    let bind = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("listening on http://{bind}");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, stopping server");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    // Failing to install the handler leaves only SIGKILL; surface it.
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl+c: {e}");
        std::future::pending::<()>().await;
    }
}
