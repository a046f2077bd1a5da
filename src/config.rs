use std::collections::HashMap;
use std::env;
use std::fs;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const EVENT_TIMEZONE: &str = "EVENT_TIMEZONE";
pub const BIND_ADDR: &str = "BIND_ADDR";
pub const RUN_MODE: &str = "RUN_MODE";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Key/value settings loaded from an optional `KEY=VALUE` file.
///
/// Lookups fall back to the process environment at call time, so values such as
/// the API key are picked up per request rather than captured at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
    env_fallback: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            env_fallback: true,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self {
            values,
            env_fallback: true,
        })
    }

    /// Config that never consults the environment. Used by tests.
    pub fn isolated<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            env_fallback: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = self
            .values
            .get(key)
            .cloned()
            .or_else(|| {
                if self.env_fallback {
                    env::var(key).ok()
                } else {
                    None
                }
            })?;
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn openai_api_key(&self) -> Option<String> {
        self.get(OPENAI_API_KEY)
    }
}
