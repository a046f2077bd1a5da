use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Body of an incoming parse request. Only `text` is read; a missing or
/// non-string value is treated as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseEventRequest {
    pub text: String,
}

impl ParseEventRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        let text = value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self { text })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventDraft {
    pub title: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub guests: Vec<Guest>,
    pub description: Option<String>,
    pub original_text: String,
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("model reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("model reply is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

impl CalendarEventDraft {
    /// Parses the model's reply and coerces it into a draft.
    ///
    /// The reply has no enforced schema, so each field is checked on its own:
    /// malformed values become null (or empty), and `originalText` is always
    /// replaced by `original_text`.
    pub fn from_model_reply(reply: &str, original_text: &str) -> Result<Self, DraftError> {
        let value: Value = serde_json::from_str(strip_code_fence(reply))?;
        let fields = match value {
            Value::Object(fields) => fields,
            other => return Err(DraftError::NotAnObject(json_kind(&other))),
        };
        Ok(Self::from_fields(&fields, original_text))
    }

    fn from_fields(fields: &Map<String, Value>, original_text: &str) -> Self {
        let title = string_field(fields, "title").unwrap_or_default();

        let date = string_field(fields, "date").and_then(|raw| {
            let parsed = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok();
            if parsed.is_none() {
                warn!(date = %raw, "dropping date that is not YYYY-MM-DD");
            }
            parsed.map(|d| d.format("%Y-%m-%d").to_string())
        });

        let time = string_field(fields, "time").and_then(|raw| {
            let raw = raw.trim();
            let parsed = NaiveTime::parse_from_str(raw, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
                .ok();
            if parsed.is_none() {
                warn!(time = %raw, "dropping time that is not HH:mm");
            }
            parsed.map(|t| t.format("%H:%M").to_string())
        });

        let duration_minutes = fields.get("durationMinutes").and_then(minutes);

        let guests = match fields.get("guests") {
            Some(Value::Array(entries)) => entries.iter().filter_map(guest).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                warn!(kind = json_kind(other), "guests is not a list, using no guests");
                Vec::new()
            }
        };

        let description = string_field(fields, "description").filter(|d| !d.trim().is_empty());

        Self {
            title,
            date,
            time,
            duration_minutes,
            guests,
            description,
            original_text: original_text.to_string(),
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn minutes(value: &Value) -> Option<u32> {
    let minutes = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u64),
        _ => None,
    }?;
    u32::try_from(minutes).ok()
}

fn guest(value: &Value) -> Option<Guest> {
    let name = value.get("name").and_then(Value::as_str).map(str::trim).unwrap_or_default();
    if name.is_empty() {
        warn!("dropping guest without a name");
        return None;
    }
    let email = value
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string);
    Some(Guest {
        name: name.to_string(),
        email,
    })
}

/// Models sometimes wrap JSON in a Markdown fence despite being told not to.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`, `JSON`, ` json`, ...).
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == ' '),
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_text_defaults_to_empty() {
        assert_eq!(ParseEventRequest::from_body(br#"{"text": 42}"#).unwrap().text, "");
        assert_eq!(ParseEventRequest::from_body(br#"{}"#).unwrap().text, "");
        assert_eq!(ParseEventRequest::from_body(br#"[1, 2]"#).unwrap().text, "");
        assert!(ParseEventRequest::from_body(b"{not json").is_err());
    }

    #[test]
    fn strips_markdown_fence() {
        let reply = "```json\n{\"title\": \"Lunch\", \"guests\": []}\n```";
        let draft = CalendarEventDraft::from_model_reply(reply, "lunch").unwrap();
        assert_eq!(draft.title, "Lunch");
        assert_eq!(draft.original_text, "lunch");
    }

    #[test]
    fn strips_fence_with_any_info_string() {
        for reply in [
            "```JSON\n{\"title\": \"Sync\"}\n```",
            "``` json\n{\"title\": \"Sync\"}\n```",
            "```\n{\"title\": \"Sync\"}\n```",
            "```json {\"title\": \"Sync\"}```",
        ] {
            let draft = CalendarEventDraft::from_model_reply(reply, "sync").unwrap();
            assert_eq!(draft.title, "Sync");
        }
    }

    #[test]
    fn rejects_non_object_replies() {
        let err = CalendarEventDraft::from_model_reply("[1, 2, 3]", "x").unwrap_err();
        assert!(matches!(err, DraftError::NotAnObject("array")));
        let err = CalendarEventDraft::from_model_reply("Sorry, I cannot help", "x").unwrap_err();
        assert!(matches!(err, DraftError::InvalidJson(_)));
    }

    #[test]
    fn coerces_loose_fields() {
        let reply = r#"{
            "date": "next friday",
            "time": "09:30:00",
            "durationMinutes": "45",
            "guests": [{"name": " Dana ", "email": ""}, {"email": "ghost@example.com"}],
            "description": "  "
        }"#;
        let draft = CalendarEventDraft::from_model_reply(reply, "standup").unwrap();
        assert_eq!(draft.title, "");
        assert_eq!(draft.date, None);
        assert_eq!(draft.time.as_deref(), Some("09:30"));
        assert_eq!(draft.duration_minutes, Some(45));
        assert_eq!(
            draft.guests,
            vec![Guest {
                name: "Dana".to_string(),
                email: None
            }]
        );
        assert_eq!(draft.description, None);
    }

    #[test]
    fn missing_guests_become_empty_list() {
        let draft =
            CalendarEventDraft::from_model_reply(r#"{"title": "Focus", "guests": null}"#, "focus")
                .unwrap();
        assert!(draft.guests.is_empty());
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["guests"], serde_json::json!([]));
        assert_eq!(json["durationMinutes"], Value::Null);
    }

    #[test]
    fn float_and_negative_durations() {
        assert_eq!(minutes(&serde_json::json!(29.6)), Some(30));
        assert_eq!(minutes(&serde_json::json!(-5)), None);
        assert_eq!(minutes(&serde_json::json!(true)), None);
    }
}
