use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::imaging::encode_base64;
use crate::load_balancer::BackendPool;
use crate::models::{CommentContext, RoomAnalysisResponse};
use crate::rooms::{DEFAULT_ANALYSIS_COMMENT, RoomType, fallback_comment};

pub const ANALYSIS_PROMPT: &str = "Przeanalizuj to pomieszczenie i napisz ciepły, entuzjastyczny komentarz jak ekspertka od projektowania wnętrz.

Zidentyfikuj typ pomieszczenia (kuchnia, pokój dzienny, sypialnia, łazienka, biuro, puste pomieszczenie) i napisz naturalny komentarz po polsku.

Format odpowiedzi:
TYP: [typ pomieszczenia]
KOMENTARZ: [ciepły, entuzjastyczny komentarz 2-3 zdania jak przyjaciółka ekspertka od wnętrz]

Bądź bardzo naturalna, ciepła i inspirująca!";

const ANALYSIS_CONFIDENCE: f32 = 0.9;
const FALLBACK_CONFIDENCE: f32 = 0.5;

// Vision backend request body
#[derive(Debug, Serialize)]
struct VisionRequest<'a> {
    image: String,
    prompt: &'a str,
    temperature: f32,
    top_p: f32,
    max_new_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    text: String,
}

/// Sends an RGB PNG to a healthy vision backend and returns its raw reply.
pub async fn ask(client: &reqwest::Client, pool: &BackendPool, png: &[u8]) -> Result<String> {
    let backend = pool.require_backend()?;
    let url = format!("{}/chat", backend.url);

    let body = VisionRequest {
        image: encode_base64(png),
        prompt: ANALYSIS_PROMPT,
        temperature: 0.7,
        top_p: 0.9,
        max_new_tokens: 300,
    };

    let res = match client.post(&url).json(&body).send().await {
        Ok(res) => res,
        Err(e) => {
            backend.set_healthy(false);
            tracing::warn!("vision backend {} failed, marked unhealthy", backend.url);
            return Err(Error::Backend { url, source: e });
        }
    };

    let status = res.status();
    if !status.is_success() {
        return Err(Error::BackendResponse {
            url,
            reason: format!("status {status}"),
        });
    }

    let reply: VisionResponse = res.json().await.map_err(|e| Error::BackendResponse {
        url,
        reason: format!("parse error: {e}"),
    })?;
    tracing::debug!("vision reply: {}", crate::prompt::truncate(&reply.text, 200));
    Ok(reply.text)
}

/// Reads the `TYP:` / `KOMENTARZ:` lines of a model reply.
pub fn parse_analysis(reply: &str) -> RoomAnalysisResponse {
    let mut room = RoomType::default();
    let mut comment = None;

    for line in reply.lines().map(str::trim) {
        if let Some(label) = line.strip_prefix("TYP:") {
            room = RoomType::from_label(label).unwrap_or_default();
        } else if let Some(text) = line.strip_prefix("KOMENTARZ:") {
            let text = text.trim();
            if !text.is_empty() {
                comment = Some(text.to_string());
            }
        }
    }

    RoomAnalysisResponse {
        detected_room_type: room.as_str().to_string(),
        confidence: ANALYSIS_CONFIDENCE,
        room_description: "Room analysis performed by the vision model".to_string(),
        suggestions: Vec::new(),
        comment: comment.unwrap_or_else(|| DEFAULT_ANALYSIS_COMMENT.to_string()),
    }
}

pub fn fallback_analysis() -> RoomAnalysisResponse {
    let room = RoomType::LivingRoom;
    RoomAnalysisResponse {
        detected_room_type: room.as_str().to_string(),
        confidence: FALLBACK_CONFIDENCE,
        room_description: "Fallback analysis due to model error".to_string(),
        suggestions: Vec::new(),
        comment: fallback_comment(Some(room), CommentContext::RoomAnalysis).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_type_and_comment() {
        let reply = "TYP: sypialnia\nKOMENTARZ: Jaka przytulna sypialnia!\n";
        let analysis = parse_analysis(reply);
        assert_eq!(analysis.detected_room_type, "bedroom");
        assert_eq!(analysis.comment, "Jaka przytulna sypialnia!");
        assert_eq!(analysis.confidence, 0.9);
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn unknown_type_and_missing_comment_use_defaults() {
        let analysis = parse_analysis("TYP: garaż\nsome chatter");
        assert_eq!(analysis.detected_room_type, "living_room");
        assert_eq!(analysis.comment, DEFAULT_ANALYSIS_COMMENT);
    }

    #[test]
    fn indented_lines_are_recognised() {
        let analysis = parse_analysis("  TYP: [kuchnia]\n   KOMENTARZ:   Piękna kuchnia.  ");
        assert_eq!(analysis.detected_room_type, "kitchen");
        assert_eq!(analysis.comment, "Piękna kuchnia.");
    }

    #[test]
    fn fallback_is_low_confidence_living_room() {
        let f = fallback_analysis();
        assert_eq!(f.detected_room_type, "living_room");
        assert_eq!(f.confidence, 0.5);
        assert_eq!(f.room_description, "Fallback analysis due to model error");
    }

    #[tokio::test]
    async fn asks_backend_with_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({
                "max_new_tokens": 300,
                "image": encode_base64(b"pngbytes"),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "TYP: biuro"})))
            .expect(1)
            .mount(&server)
            .await;

        let pool = BackendPool::new("vision", &server.uri()).unwrap();
        let reply = ask(&reqwest::Client::new(), &pool, b"pngbytes").await.unwrap();
        assert_eq!(reply, "TYP: biuro");
    }
}
