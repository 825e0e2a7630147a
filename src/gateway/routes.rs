use crate::gateway::GatewayState;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build all routes for the health listener.
pub fn build_routes(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    #[serde(flatten)]
    pub stats: crate::stats::StatsSnapshot,
}

async fn health_handler(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "imgrelay".to_string(),
        version: state.version.clone(),
        stats: state.stats.snapshot(),
    })
}

// ============================================================================
// Service Info
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    pub max_file_size_mb: u64,
}

async fn info_handler(State(state): State<GatewayState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Telegram Image Uploader Bot".to_string(),
        description: "Upload images to ImgBB via Telegram".to_string(),
        version: state.version.clone(),
        max_file_size_mb: state.max_size_mb,
    })
}

// ============================================================================
// Landing Page & Fallback
// ============================================================================

const INDEX_HTML: &str = "<!DOCTYPE html>\
<html><head><title>imgrelay</title></head>\
<body><h1>imgrelay</h1>\
<p>Telegram image relay is running.</p>\
<p>See <a href=\"/health\">/health</a> and <a href=\"/info\">/info</a>.</p>\
</body></html>";

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Endpoint not found" })),
    )
}
