use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

const EXTRACTION_RULES: &str = "You are a strict JSON calendar event extraction engine.\n\
Task: From the user's message, extract a single calendar event.\n\
Rules:\n\
- Extract EVERY person named in the message as a guest, unless the message explicitly excludes them (e.g. \"without Sam\").\n\
- Do NOT infer or add people who are not named in the message.\n\
- Never invent email addresses. Use an email only if it appears verbatim in the message; otherwise set \"email\" to null so it can be requested later.\n\
- \"date\" must be YYYY-MM-DD, or null if no date can be determined.\n\
- \"time\" must be 24-hour HH:mm, or null if no time is given.\n\
- \"durationMinutes\" must be an integer number of minutes, or null if not given.\n\
- \"title\" is a short event title; \"description\" is a one-sentence summary or null.\n\
- Resolve relative dates (\"tomorrow\", \"next Friday\") against the reference date below.\n\
- Output ONLY raw JSON, no prose, markdown, or code fences.\n\
- The JSON shape must be exactly:\n\
{\"title\":\"<string>\",\"date\":\"<YYYY-MM-DD>|null\",\"time\":\"<HH:mm>|null\",\"durationMinutes\":<integer>|null,\"guests\":[{\"name\":\"<string>\",\"email\":\"<string>|null\"}],\"description\":\"<string>|null\"}";

/// Resolves a configured zone name, falling back to UTC.
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!(timezone = %name, "unknown timezone, using UTC");
        Tz::UTC
    })
}

/// System instruction sent with every extraction request.
pub fn system_prompt(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    format!(
        "{EXTRACTION_RULES}\nReference date: today is {date} ({weekday}) in {tz}.",
        date = local.format("%Y-%m-%d"),
        weekday = local.format("%A"),
        tz = tz.name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reference_date_uses_configured_zone() {
        let now = Utc.with_ymd_and_hms(2025, 11, 20, 23, 30, 0).unwrap();
        let prompt = system_prompt(now, parse_timezone("Asia/Tokyo"));
        assert!(prompt.contains("today is 2025-11-21 (Friday) in Asia/Tokyo"));
        assert!(prompt.contains("Never invent email addresses"));
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        assert_eq!(parse_timezone("Mars/Olympus"), Tz::UTC);
    }
}
