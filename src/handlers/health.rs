use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::load_balancer::BackendPool;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "Aura FLUX API";
pub const DIFFUSION_MODEL: &str = "flux-1-kontext";
pub const VISION_MODEL: &str = "minicpm-v-2.6";

fn pool_status(pool: &BackendPool) -> serde_json::Value {
    serde_json::json!({
        "healthy": pool.healthy_count(),
        "total": pool.all_backends().len(),
    })
}

pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": ["/generate", "/analyze-room", "/llm-comment", "/health", "/metrics"],
    }))
}

// health handler
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "model": DIFFUSION_MODEL,
        "vision_model": VISION_MODEL,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "backends": {
            "diffusion": pool_status(&state.diffusion),
            "vision": pool_status(&state.vision),
        },
        "chat_configured": state.chat.has_key(),
    }))
}
