use std::time::Instant;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request to completion service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode completion response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("completion response contained no message content")]
    Empty,
}

impl OpenAIRequest {
    /// One system turn, one user turn, deterministic sampling.
    pub fn extraction(model: &str, system_prompt: String, user_text: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            temperature: 0.0,
        }
    }
}

pub fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

pub async fn query_openai(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &OpenAIRequest,
) -> Result<String, CompletionError> {
    let started = Instant::now();
    let response = client
        .post(completions_url(base_url))
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?; // read the body once
    debug!(
        %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        model = %request.model,
        "completion service responded"
    );

    if !status.is_success() {
        warn!(%status, "completion service returned an error status");
        return Err(CompletionError::Status { status, body: text });
    }

    first_choice_content(&text)
}

/// Pulls the first choice's message content out of a raw response body.
pub fn first_choice_content(body: &str) -> Result<String, CompletionError> {
    let parsed: OpenAIResponse = serde_json::from_str(body)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(CompletionError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"title\":\"A\"}"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(first_choice_content(body).unwrap(), r#"{"title":"A"}"#);
    }

    #[test]
    fn empty_choices_and_null_content_are_errors() {
        assert!(matches!(
            first_choice_content(r#"{"choices":[]}"#),
            Err(CompletionError::Empty)
        ));
        assert!(matches!(
            first_choice_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(CompletionError::Empty)
        ));
        assert!(matches!(
            first_choice_content("<html>bad gateway</html>"),
            Err(CompletionError::Decode(_))
        ));
    }

    #[test]
    fn request_shape() {
        let request = OpenAIRequest::extraction("gpt-4o-mini", "rules".to_string(), "lunch");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["temperature"], serde_json::json!(0.0));
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "lunch");
        assert_eq!(completions_url("http://localhost:9/v1/"), "http://localhost:9/v1/chat/completions");
    }
}
