use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;

use crate::config::OPENAI_API_KEY;

/// Failures surfaced to the caller of the parse-event endpoint.
#[derive(Debug, Error)]
pub enum ParseEventError {
    #[error("Invalid JSON body")]
    BadRequest { details: String },

    #[error("Only POST is supported")]
    MethodNotAllowed,

    #[error("Missing {0}")]
    Configuration(&'static str),

    #[error("LLM parsing failed")]
    UpstreamFailure { details: String },
}

/// JSON body returned for every failure.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ParseEventError {
    pub fn bad_request(details: impl ToString) -> Self {
        Self::BadRequest {
            details: details.to_string(),
        }
    }

    pub fn upstream(details: impl ToString) -> Self {
        Self::UpstreamFailure {
            details: details.to_string(),
        }
    }

    pub fn missing_api_key() -> Self {
        Self::Configuration(OPENAI_API_KEY)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Configuration(_) | Self::UpstreamFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            Self::BadRequest { details } | Self::UpstreamFailure { details } => {
                Some(details.clone())
            }
            Self::MethodNotAllowed | Self::Configuration(_) => None,
        };
        ErrorEnvelope {
            error: self.to_string(),
            details,
        }
    }
}

impl ErrorEnvelope {
    pub fn message(error: &str) -> Self {
        Self {
            error: error.to_string(),
            details: None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", self.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_the_credential() {
        let err = ParseEventError::missing_api_key();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.envelope().to_json(), r#"{"error":"Missing OPENAI_API_KEY"}"#);
    }

    #[test]
    fn bad_request_carries_details() {
        let envelope = ParseEventError::bad_request("EOF while parsing").envelope();
        assert_eq!(envelope.error, "Invalid JSON body");
        assert_eq!(envelope.details.as_deref(), Some("EOF while parsing"));
    }
}
