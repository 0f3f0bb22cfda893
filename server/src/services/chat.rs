//! Assistant replies backed by the Gemini `generateContent` REST API.

use icewatch_shared::ChatMessageResponse;
use serde_json::{Value, json};

pub const NOT_CONFIGURED_REPLY: &str =
    "I am not connected to an LLM yet. Please set the GOOGLE_API_KEY environment variable.";
pub const NOT_CONFIGURED_NOTE: &str = "Missing GOOGLE_API_KEY";
pub const UPSTREAM_FAILURE_REPLY: &str = "I encountered an error calling the Gemini model.";

const PLACEHOLDER_KEY_MARKER: &str = "your-api-key";
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response contained no text")]
    EmptyReply,
}

#[derive(Clone)]
pub struct ChatService {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl ChatService {
    pub fn new(
        http_client: reqwest::Client,
        api_key: Option<String>,
        model: String,
        api_base: String,
    ) -> Self {
        let api_key = api_key.filter(|key| !key.contains(PLACEHOLDER_KEY_MARKER));
        Self {
            http_client,
            api_key,
            model,
            api_base,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Produce a reply for `message`. Never fails: a missing key or an
    /// upstream error becomes an explanatory reply plus note.
    pub async fn reply(&self, message: &str, dataset_context: &str) -> ChatMessageResponse {
        let Some(api_key) = self.api_key.as_deref() else {
            return ChatMessageResponse {
                reply: NOT_CONFIGURED_REPLY.to_string(),
                note: Some(NOT_CONFIGURED_NOTE.to_string()),
            };
        };

        match self.generate(api_key, message, dataset_context).await {
            Ok(reply) => ChatMessageResponse { reply, note: None },
            Err(e) => {
                tracing::warn!(error = %e, model = %self.model, "Gemini request failed");
                ChatMessageResponse {
                    reply: UPSTREAM_FAILURE_REPLY.to_string(),
                    note: Some(format!(
                        "Error: {e}. Check your API key and model availability."
                    )),
                }
            }
        }
    }

    async fn generate(
        &self,
        api_key: &str,
        message: &str,
        dataset_context: &str,
    ) -> Result<String, ChatError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&request_body(message, dataset_context))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let payload: Value = response.json().await?;
        extract_reply_text(&payload).ok_or(ChatError::EmptyReply)
    }
}

pub fn system_prompt(dataset_context: &str) -> String {
    format!(
        "You are an intelligent assistant for a NASA Sea Ice Analysis application. \
         Your goal is to help users understand sea ice extent data. \
         {dataset_context}. Answer concise and helpful."
    )
}

/// One-line description of the dataset catalogue for the system prompt.
pub fn dataset_context(dates: Option<&[String]>) -> String {
    match dates {
        Some(dates) => {
            let range = match (dates.first(), dates.last()) {
                (Some(first), Some(last)) => format!("{first} to {last}"),
                _ => "No data available".to_string(),
            };
            format!(
                "Dataset Context: There are {} valid sea ice extent snapshots available. \
                 The date range is {range}",
                dates.len()
            )
        }
        None => "Dataset Context: Unable to retrieve dataset statistics at this time".to_string(),
    }
}

fn request_body(message: &str, dataset_context: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": system_prompt(dataset_context) }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": message }]
        }],
        "generationConfig": { "temperature": TEMPERATURE }
    })
}

/// Concatenate the text parts of the first candidate.
fn extract_reply_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    use super::*;

    async fn spawn_fake_gemini(router: axum::Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake upstream");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve fake upstream");
        });
        (addr, handle)
    }

    fn service(api_key: Option<&str>, base: String) -> ChatService {
        ChatService::new(
            reqwest::Client::new(),
            api_key.map(str::to_string),
            "gemini-test".to_string(),
            base,
        )
    }

    #[tokio::test]
    async fn missing_or_placeholder_key_replies_without_upstream_call() {
        for key in [None, Some("your-api-key-here")] {
            let chat = service(key, "http://127.0.0.1:9".to_string());
            assert!(!chat.is_configured());
            let response = chat.reply("hello", "ctx").await;
            assert_eq!(response.reply, NOT_CONFIGURED_REPLY);
            assert_eq!(response.note.as_deref(), Some(NOT_CONFIGURED_NOTE));
        }
    }

    #[tokio::test]
    async fn successful_call_returns_candidate_text() {
        let router = axum::Router::new().route(
            "/v1beta/models/{model}",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()),
                    Some("secret")
                );
                let question = body["contents"][0]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let system = body["systemInstruction"]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or_default();
                assert!(system.contains("There are 3 valid"));
                Json(json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "Echo: "}, {"text": question}]}
                    }]
                }))
            }),
        );
        let (addr, handle) = spawn_fake_gemini(router).await;

        let dates = vec![
            "2024-01-01".to_string(),
            "2024-01-02".to_string(),
            "2024-01-03".to_string(),
        ];
        let context = dataset_context(Some(dates.as_slice()));
        let response = service(Some("secret"), format!("http://{addr}"))
            .reply("how thick?", &context)
            .await;
        assert_eq!(response.reply, "Echo: how thick?");
        assert_eq!(response.note, None);

        handle.abort();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn upstream_error_becomes_failure_reply_with_note() {
        let router = axum::Router::new().route(
            "/v1beta/models/{model}",
            post(|| async { (StatusCode::FORBIDDEN, "API key not valid") }),
        );
        let (addr, handle) = spawn_fake_gemini(router).await;

        let response = service(Some("bad"), format!("http://{addr}"))
            .reply("hi", "ctx")
            .await;
        assert_eq!(response.reply, UPSTREAM_FAILURE_REPLY);
        let note = response.note.expect("failure note");
        assert!(note.contains("403"));
        assert!(note.ends_with("Check your API key and model availability."));

        handle.abort();
        let _ = handle.await;
    }

    #[test]
    fn context_describes_range_or_absence() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(
            dataset_context(Some(empty.as_slice())),
            "Dataset Context: There are 0 valid sea ice extent snapshots available. \
             The date range is No data available"
        );
        assert!(dataset_context(None).contains("Unable to retrieve"));
    }

    #[test]
    fn reply_text_requires_non_empty_parts() {
        assert_eq!(extract_reply_text(&json!({"candidates": []})), None);
        assert_eq!(
            extract_reply_text(&json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]})),
            None
        );
    }
}
