use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod chat;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod imaging;
pub mod load_balancer;
pub mod metrics;
pub mod models;
pub mod params;
pub mod prompt;
pub mod quota;
pub mod rooms;
pub mod state;
pub mod vision;
pub mod worker;

pub use errors::{Error, Result};

use config::Args;
use state::AppState;

/// Builds the shared state, starts the generation worker and returns the router.
///
/// Must be called inside a tokio runtime. Health probing is left to the
/// caller, see [`spawn_health_checkers`].
pub fn build(args: &Args) -> Result<(Arc<AppState>, Router)> {
    let (state, jobs_rx) = AppState::new(args)?;
    let state = Arc::new(state);

    tokio::spawn(worker::generation_worker(
        jobs_rx,
        state.client.clone(),
        Arc::clone(&state.diffusion),
    ));

    let app = router(Arc::clone(&state), args);
    Ok((state, app))
}

pub fn spawn_health_checkers(state: &AppState, args: &Args) {
    for pool in [&state.diffusion, &state.vision] {
        tokio::spawn(load_balancer::health_checker(
            Arc::clone(pool),
            state.client.clone(),
            args.health_interval(),
        ));
    }
}

pub fn router(state: Arc<AppState>, args: &Args) -> Router {
    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/generate", post(handlers::generate_handler))
        .route("/v1/images/generations", post(handlers::generate_handler))
        .route("/analyze-room", post(handlers::analyze_room_handler))
        .route("/llm-comment", post(handlers::comment_handler))
        .layer(DefaultBodyLimit::max(args.max_body_bytes))
        .layer(cors_layer(&args.cors_origins()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {o}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
