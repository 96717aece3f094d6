//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for video processing, chat, and video housekeeping.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::TubeRagError;
use crate::openai::is_api_key_configured;
use crate::orchestrator::{Orchestrator, ProcessingStats, SystemStats, VideoInfo, VideoSummary};
use crate::rag::RankedChunk;
use crate::transcript::VideoUrl;
use crate::vector_store::IndexStats;
use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, warn};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let cors = cors_layer(&settings.server.allowed_origins);
    let orchestrator = Orchestrator::new(settings)?;

    let state = Arc::new(AppState { orchestrator });

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/process-video", post(process_video))
        .route("/chat", post(chat))
        .route("/video/{video_id}/info", get(video_info))
        .route("/video/{video_id}/summary", get(video_summary))
        .route("/video/{video_id}", axum::routing::delete(delete_video))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("tuberag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Stats", "GET    /stats");
    Output::kv("Process", "POST   /process-video");
    Output::kv("Chat", "POST   /chat");
    Output::kv("Video Info", "GET    /video/:video_id/info");
    Output::kv("Summary", "GET    /video/:video_id/summary");
    Output::kv("Delete", "DELETE /video/:video_id");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS for the configured origins. Unparseable origins are skipped, and an
/// empty list or a `*` entry allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn allow_origin(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return AllowOrigin::any();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    AllowOrigin::list(origins)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ProcessVideoRequest {
    youtube_url: String,
}

#[derive(Serialize)]
struct ProcessVideoResponse {
    success: bool,
    message: String,
    video_id: String,
    video_info: VideoUrl,
    #[serde(skip_serializing_if = "Option::is_none")]
    processing_stats: Option<ProcessingStats>,
}

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_id: Option<String>,
    context_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    relevant_chunks: Option<Vec<RankedChunk>>,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// A pipeline error rendered as an HTTP response.
struct ApiError(TubeRagError);

impl From<TubeRagError> for ApiError {
    fn from(e: TubeRagError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn status_for(e: &TubeRagError) -> StatusCode {
    match e {
        TubeRagError::VideoNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "tuberag API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let index = state.orchestrator.index();
    let index_ok = index.is_healthy().await;
    let stats = index.stats().await;

    Json(health_body(index_ok, is_api_key_configured(), &stats))
}

fn health_body(index_ok: bool, generator_ok: bool, stats: &IndexStats) -> serde_json::Value {
    let component = |ok: bool| if ok { "ok" } else { "error" };
    let status = if index_ok { "healthy" } else { "degraded" };

    serde_json::json!({
        "status": status,
        "components": {
            "vector_store": component(index_ok),
            "generator": component(generator_ok),
            "embedder": "ok",
        },
        "stats": stats,
    })
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<SystemStats> {
    Json(state.orchestrator.stats().await)
}

async fn process_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessVideoRequest>,
) -> ApiResult<ProcessVideoResponse> {
    let result = state.orchestrator.process_video(&req.youtube_url).await?;

    Ok(Json(ProcessVideoResponse {
        success: true,
        message: result.message,
        video_id: result.video_id,
        video_info: result.url,
        processing_stats: result.stats,
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    match req.video_id {
        Some(video_id) => {
            let response = state.orchestrator.ask(&req.query, Some(&video_id)).await?;
            Ok(Json(ChatResponse {
                response: response.answer,
                query: req.query,
                video_id: Some(video_id),
                context_used: response.context_used,
                relevant_chunks: Some(response.retrieval.ranked_chunks),
            }))
        }
        None => {
            let answer = state.orchestrator.ask_general(&req.query).await?;
            Ok(Json(ChatResponse {
                response: answer,
                query: req.query,
                video_id: None,
                context_used: false,
                relevant_chunks: None,
            }))
        }
    }
}

async fn video_info(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> ApiResult<VideoInfo> {
    Ok(Json(state.orchestrator.video_info(&video_id).await?))
}

async fn video_summary(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> ApiResult<VideoSummary> {
    Ok(Json(state.orchestrator.summarize(&video_id).await?))
}

async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.orchestrator.delete_video(&video_id).await? {
        Ok(Json(serde_json::json!({
            "success": true,
            "message": format!("Video {} deleted successfully", video_id),
        })))
    } else {
        Err(ApiError(TubeRagError::VideoNotFound(video_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&TubeRagError::InvalidUrl("nope".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TubeRagError::TranscriptsDisabled("abc".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TubeRagError::VideoNotFound("abc".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&TubeRagError::Index("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_uses_detail() {
        let response = ApiError(TubeRagError::VideoNotFound("abc".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_empty_origin_list_allows_any() {
        let any = format!("{:?}", AllowOrigin::any());
        assert_eq!(format!("{:?}", allow_origin(&[])), any);

        let listed = allow_origin(&["http://localhost:3000".to_string()]);
        assert_ne!(format!("{:?}", listed), any);

        assert_eq!(format!("{:?}", allow_origin(&["*".to_string()])), any);

        // Building the layer from an empty list must not panic
        let _ = cors_layer(&[]);
    }

    #[test]
    fn test_health_reports_index_failure() {
        let stats = IndexStats::default();

        let body = health_body(true, true, &stats);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["components"]["vector_store"], "ok");

        let body = health_body(false, true, &stats);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["components"]["vector_store"], "error");
        assert_eq!(body["components"]["generator"], "ok");
    }

    #[test]
    fn test_chat_request_video_is_optional() {
        let req: ChatRequest = serde_json::from_str(r#"{"query": "hello"}"#).unwrap();
        assert_eq!(req.query, "hello");
        assert!(req.video_id.is_none());
    }
}
