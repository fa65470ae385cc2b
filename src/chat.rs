//! Designer comments from an OpenAI-compatible chat completion API.
//!
//! The endpoint never fails towards the client: a missing key, an API error
//! or an unparseable answer all fall back to a canned comment for the room.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::models::{CommentContext, CommentRequest, CommentResponse};
use crate::prompt::truncate;
use crate::rooms::{RoomType, fallback_comment};

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

/// Outcome of a comment request; only model answers are worth caching.
#[derive(Debug, Clone, PartialEq)]
pub enum Comment {
    Model(CommentResponse),
    Fallback(CommentResponse),
}

impl Comment {
    pub fn into_inner(self) -> CommentResponse {
        match self {
            Comment::Model(r) | Comment::Fallback(r) => r,
        }
    }
}

impl ChatClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let Some(key) = &self.api_key else {
            return Err(Error::Chat("API key not configured".to_string()));
        };
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!("calling chat API {} with prompt length {}", url, prompt.len());

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Backend {
                url: url.clone(),
                source: e,
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("status {status}: {}", truncate(&text, 200))));
        }

        let parsed: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| Error::Chat(format!("parse error: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Chat("empty completion".to_string()))
    }

    pub async fn comment(&self, req: &CommentRequest, max_chars: usize) -> Comment {
        let room = RoomType::from_label(&req.room_type);
        let fallback = || {
            Comment::Fallback(CommentResponse {
                comment: fallback_comment(room, req.context).to_string(),
                suggestions: Vec::new(),
            })
        };

        let prompt = build_comment_prompt(req, room, max_chars);
        match self.complete(&prompt).await {
            Ok(content) => {
                let parsed = parse_comment(&content);
                if parsed.comment.is_empty() {
                    tracing::warn!("chat answer had no comment line, using fallback");
                    fallback()
                } else {
                    Comment::Model(parsed)
                }
            }
            Err(e) => {
                tracing::warn!("chat comment failed: {e}");
                fallback()
            }
        }
    }
}

pub fn build_comment_prompt(
    req: &CommentRequest,
    room: Option<RoomType>,
    max_chars: usize,
) -> String {
    let description = truncate(req.room_description.trim(), max_chars);
    match req.context {
        CommentContext::RoomAnalysis => {
            let room_name = room.map(|r| r.polish_instrumental()).unwrap_or("pomieszczeniem");
            format!(
                "Jesteś IDA - ekspertką od projektowania wnętrz z wieloletnim doświadczeniem. Użytkownik przesłał zdjęcie {room_name}.

Analiza techniczna: {description}

Napisz bardzo naturalny, ciepły komentarz jak przyjaciółka, która jest ekspertką od wnętrz. Bądź entuzjastyczna, konkretna i inspirująca. Skup się na tym co widzisz na zdjęciu.

Format odpowiedzi:
KOMMENTARZ: [ciepły, entuzjastyczny komentarz 2-3 zdania o tym co widzisz]

Bądź bardzo naturalna, ciepła i inspirująca. Jak prawdziwa ekspertka od wnętrz!"
            )
        }
        CommentContext::GeneratedImage => {
            let room_type = truncate(req.room_type.trim(), 64);
            format!(
                "Jesteś IDA - Inteligentnym Asystentem Projektowania Wnętrz. Oceń wygenerowane wnętrze i napisz krótki komentarz po polsku.

Typ pomieszczenia: {room_type}
Opis pomieszczenia: {description}

Napisz:
1. Krótki komentarz (2-3 zdania) o wygenerowanym wnętrzu
2. 3 konkretne sugestie do dalszych poprawek

Format odpowiedzi:
KOMMENTARZ: [twój komentarz]
SUGESTIE:
- [sugestia 1]
- [sugestia 2]
- [sugestia 3]

Bądź profesjonalny, konkretny i pomocny."
            )
        }
    }
}

/// Extracts the comment line and the `-` bullets after `SUGESTIE:`.
pub fn parse_comment(content: &str) -> CommentResponse {
    let mut comment = String::new();
    let mut suggestions = Vec::new();
    let mut in_suggestions = false;

    for line in content.lines().map(str::trim) {
        // models spell the label both ways
        let label = line
            .strip_prefix("KOMMENTARZ:")
            .or_else(|| line.strip_prefix("KOMENTARZ:"));
        if let Some(text) = label {
            comment = text.trim().to_string();
            in_suggestions = false;
        } else if line.starts_with("SUGESTIE:") {
            in_suggestions = true;
        } else if in_suggestions {
            if let Some(item) = line.strip_prefix('-') {
                let item = item.trim();
                if !item.is_empty() {
                    suggestions.push(item.to_string());
                }
            }
        }
    }

    CommentResponse { comment, suggestions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(context: CommentContext) -> CommentRequest {
        CommentRequest {
            room_type: "kitchen".into(),
            room_description: "white cabinets, oak floor".into(),
            context,
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[test]
    fn parses_comment_and_suggestions() {
        let parsed = parse_comment(
            "KOMMENTARZ: Piękne wnętrze.\nSUGESTIE:\n- więcej roślin\n-  cieplejsze światło \n-\nkoniec",
        );
        assert_eq!(parsed.comment, "Piękne wnętrze.");
        assert_eq!(parsed.suggestions, vec!["więcej roślin", "cieplejsze światło"]);
    }

    #[test]
    fn bullets_before_header_are_ignored() {
        let parsed = parse_comment("- stray\nKOMENTARZ: ok");
        assert_eq!(parsed.comment, "ok");
        assert!(parsed.suggestions.is_empty());
    }

    #[test]
    fn analysis_prompt_names_room_in_polish() {
        let prompt = build_comment_prompt(
            &request(CommentContext::RoomAnalysis),
            Some(RoomType::Kitchen),
            1500,
        );
        assert!(prompt.contains("zdjęcie kuchnią"));
        assert!(prompt.contains("Analiza techniczna: white cabinets, oak floor"));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let mut req = request(CommentContext::GeneratedImage);
        req.room_description = "word ".repeat(1000);
        let prompt = build_comment_prompt(&req, Some(RoomType::Kitchen), 20);
        assert!(prompt.contains("Opis pomieszczenia: word word word word\n"));
    }

    #[tokio::test]
    async fn missing_key_falls_back_without_calling_out() {
        let chat = ChatClient::new(reqwest::Client::new(), "http://127.0.0.1:1", None, "m".into());
        let comment = chat.comment(&request(CommentContext::GeneratedImage), 100).await;
        let expected = fallback_comment(Some(RoomType::Kitchen), CommentContext::GeneratedImage);
        assert_eq!(
            comment,
            Comment::Fallback(CommentResponse {
                comment: expected.to_string(),
                suggestions: vec![]
            })
        );
    }

    #[tokio::test]
    async fn model_answer_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "llama-3.3-70b-versatile", "max_tokens": 500})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "KOMMENTARZ: Wspaniała kuchnia!\nSUGESTIE:\n- dodaj rośliny",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let chat = ChatClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Some("test-key".into()),
            "llama-3.3-70b-versatile".into(),
        );
        let comment = chat.comment(&request(CommentContext::GeneratedImage), 1500).await;
        assert_eq!(
            comment,
            Comment::Model(CommentResponse {
                comment: "Wspaniała kuchnia!".into(),
                suggestions: vec!["dodaj rośliny".into()],
            })
        );
    }

    #[tokio::test]
    async fn api_error_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
            })))
            .mount(&server)
            .await;

        let chat = ChatClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Some("k".into()),
            "m".into(),
        );
        let comment = chat.comment(&request(CommentContext::RoomAnalysis), 1500).await;
        assert!(matches!(comment, Comment::Fallback(_)));
    }
}
