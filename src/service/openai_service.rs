use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;

use crate::clients::openai_client::{self, CompletionError, OpenAIRequest};
use crate::config::{self, AppConfig};
use crate::service::prompt;

/// Sends raw event text to a completion model and returns its reply verbatim.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, text: &str, api_key: &str) -> Result<String, CompletionError>;
}

pub struct OpenAIService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timezone: Tz,
}

impl OpenAIService {
    pub fn new(base_url: String, model: String, timezone: Tz) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            timezone,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.get_or(config::OPENAI_BASE_URL, config::DEFAULT_BASE_URL),
            config.get_or(config::OPENAI_MODEL, config::DEFAULT_MODEL),
            prompt::parse_timezone(&config.get_or(config::EVENT_TIMEZONE, config::DEFAULT_TIMEZONE)),
        )
    }
}

#[async_trait]
impl CompletionClient for OpenAIService {
    async fn complete(&self, text: &str, api_key: &str) -> Result<String, CompletionError> {
        let request = OpenAIRequest::extraction(
            &self.model,
            prompt::system_prompt(Utc::now(), self.timezone),
            text,
        );
        openai_client::query_openai(&self.client, &self.base_url, api_key, &request).await
    }
}
