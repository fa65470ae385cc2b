use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use crate::errors::Result;
use crate::imaging::{decode_base64_image, normalize_to_rgb_png};
use crate::metrics::{ANALYSIS_FALLBACKS, QUOTA_REJECTIONS, QUOTA_SESSIONS, REQUEST_TOTAL};
use crate::models::{RoomAnalysisRequest, RoomAnalysisResponse};
use crate::state::AppState;
use crate::vision;

pub const SESSION_HEADER: &str = "x-session-id";

// header wins over the body field; ids are opaque, only blank means anonymous
fn session_id<'a>(headers: &'a HeaderMap, body: Option<&'a str>) -> Option<&'a str> {
    let present = |s: &&str| !s.trim().is_empty();
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(present)
        .or_else(|| body.filter(present))
}

pub async fn analyze_room_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RoomAnalysisRequest>,
) -> Result<Json<RoomAnalysisResponse>> {
    REQUEST_TOTAL.with_label_values(&["analyze_room"]).inc();

    // quota gate comes before any expensive work
    let session = session_id(&headers, payload.session_id.as_deref());
    let policy = state.quota_policy;
    let checked = state
        .quota
        .check_and_record(session, policy.max_calls, policy.window);
    QUOTA_SESSIONS.set(state.quota.tracked_sessions() as f64);
    if let Err(e) = checked {
        QUOTA_REJECTIONS.inc();
        return Err(e.into());
    }
    tracing::info!("room analysis request (session: {})", session.unwrap_or("-"));

    let bytes = decode_base64_image(&payload.image)?;
    let png = tokio::task::spawn_blocking(move || normalize_to_rgb_png(&bytes)).await??;

    let analysis = match vision::ask(&state.client, &state.vision, &png).await {
        Ok(reply) => vision::parse_analysis(&reply),
        Err(e) => {
            tracing::warn!("room analysis failed, answering with fallback: {e}");
            ANALYSIS_FALLBACKS.inc();
            vision::fallback_analysis()
        }
    };
    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_session_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(session_id(&headers, Some("from-body")), Some("from-header"));
    }

    #[test]
    fn body_session_is_used_without_header() {
        let headers = HeaderMap::new();
        assert_eq!(session_id(&headers, Some("abc")), Some("abc"));
        assert_eq!(session_id(&headers, Some("   ")), None);
        assert_eq!(session_id(&headers, None), None);
    }

    #[test]
    fn session_ids_are_kept_verbatim() {
        let headers = HeaderMap::new();
        assert_eq!(session_id(&headers, Some(" a")), Some(" a"));
        assert_ne!(session_id(&headers, Some(" a")), session_id(&headers, Some("a")));
    }

    #[test]
    fn blank_header_falls_back_to_body() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static(""));
        assert_eq!(session_id(&headers, Some("b")), Some("b"));
    }
}
