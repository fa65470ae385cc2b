use axum::{Json, extract::State};
use std::sync::Arc;

use crate::cache::make_cache_key;
use crate::chat::Comment;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{CommentRequest, CommentResponse};
use crate::state::AppState;

pub async fn comment_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CommentRequest>,
) -> Json<CommentResponse> {
    REQUEST_TOTAL.with_label_values(&["llm_comment"]).inc();
    tracing::info!(
        "comment request for room type {} ({})",
        payload.room_type,
        payload.context.as_str()
    );

    // check cache first
    let cache_key = make_cache_key(&payload);
    if let Some(hit) = state.comments.get(&cache_key) {
        tracing::debug!("comment cache HIT");
        return Json(hit);
    }

    match state.chat.comment(&payload, state.max_prompt_chars).await {
        Comment::Model(response) => {
            state.comments.insert(cache_key, response.clone());
            Json(response)
        }
        // fallbacks are cheap, keep retrying the model next time
        fallback => Json(fallback.into_inner()),
    }
}
