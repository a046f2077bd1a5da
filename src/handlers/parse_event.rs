use std::sync::Arc;

use tracing::{info, warn};
use warp::http::{Method, StatusCode};

use crate::config::AppConfig;
use crate::error::ParseEventError;
use crate::models::event::{CalendarEventDraft, ParseEventRequest};
use crate::service::openai_service::CompletionClient;

/// Headers attached to every response so browsers can call the endpoint
/// cross-origin.
pub fn build_headers() -> [(&'static str, &'static str); 4] {
    [
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ]
}

/// Status and body produced by the handler; `None` means no body at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: Option<String>,
}

impl HandlerResponse {
    fn error(err: &ParseEventError) -> Self {
        warn!(status = %err.status(), error = %err, "parse-event request failed");
        Self {
            status: err.status(),
            body: Some(err.envelope().to_json()),
        }
    }
}

pub struct EventExtractionHandler {
    config: Arc<AppConfig>,
    completions: Arc<dyn CompletionClient>,
}

impl EventExtractionHandler {
    pub fn new(config: Arc<AppConfig>, completions: Arc<dyn CompletionClient>) -> Self {
        Self {
            config,
            completions,
        }
    }

    pub async fn handle(&self, method: &Method, body: &[u8]) -> HandlerResponse {
        if method == Method::OPTIONS {
            return HandlerResponse {
                status: StatusCode::NO_CONTENT,
                body: None,
            };
        }
        if method != Method::POST {
            return HandlerResponse::error(&ParseEventError::MethodNotAllowed);
        }

        let request = match ParseEventRequest::from_body(body) {
            Ok(request) => request,
            Err(err) => return HandlerResponse::error(&ParseEventError::bad_request(err)),
        };

        let draft = match self.extract(&request.text).await {
            Ok(draft) => draft,
            Err(err) => return HandlerResponse::error(&err),
        };

        match serde_json::to_string_pretty(&draft) {
            Ok(body) => HandlerResponse {
                status: StatusCode::OK,
                body: Some(body),
            },
            Err(err) => HandlerResponse::error(&ParseEventError::upstream(err)),
        }
    }

    /// Runs one extraction: credential lookup, a single remote call, then
    /// parsing the reply with `originalText` stamped to `text`.
    pub async fn extract(&self, text: &str) -> Result<CalendarEventDraft, ParseEventError> {
        let api_key = self
            .config
            .openai_api_key()
            .ok_or_else(ParseEventError::missing_api_key)?;

        let reply = self
            .completions
            .complete(text, &api_key)
            .await
            .map_err(ParseEventError::upstream)?;

        let draft =
            CalendarEventDraft::from_model_reply(&reply, text).map_err(ParseEventError::upstream)?;
        info!(guests = draft.guests.len(), has_date = draft.date.is_some(), "extracted event draft");
        Ok(draft)
    }
}
